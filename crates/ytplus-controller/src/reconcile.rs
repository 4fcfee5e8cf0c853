//! Pure helpers that fold a status snapshot into view models.

use ytplus_api_models::{DownloadStatus, StatusSnapshot};

use crate::view::ProgressView;

/// Placeholder for absent speed/ETA values.
const PLACEHOLDER: &str = "-";

/// Clamp a raw percentage to a whole number in `0..=100`. NaN maps to 0.
#[must_use]
pub fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    let clamped = raw.round().clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = clamped as u8;
    percent
}

/// Composite label combining percentage and status word.
#[must_use]
pub fn progress_label(percent: u8, status: DownloadStatus) -> String {
    format!("{percent}% - {}", status.label())
}

/// Current-action text with a stall prefix once the stall exceeds the threshold.
#[must_use]
pub fn action_text(
    current_action: Option<&str>,
    stalled_for: Option<u64>,
    threshold_secs: u64,
) -> Option<String> {
    let action = current_action
        .map(str::trim)
        .filter(|action| !action.is_empty());
    match stalled_for.filter(|secs| *secs > threshold_secs) {
        Some(secs) => Some(match action {
            Some(action) => format!("Stalled for {secs}s - {action}"),
            None => format!("Stalled for {secs}s"),
        }),
        None => action.map(str::to_string),
    }
}

/// Build the progress view for a snapshot.
#[must_use]
pub fn progress_view(snapshot: &StatusSnapshot, stall_threshold_secs: u64) -> ProgressView {
    let percent = clamp_percent(snapshot.progress);
    ProgressView {
        percent,
        status: snapshot.status,
        label: progress_label(percent, snapshot.status),
        speed: non_empty(snapshot.speed.as_deref()).unwrap_or(PLACEHOLDER).to_string(),
        eta: non_empty(snapshot.eta.as_deref()).unwrap_or(PLACEHOLDER).to_string(),
        title: non_empty(snapshot.title.as_deref()).map(str::to_string),
        action: action_text(
            snapshot.current_action.as_deref(),
            snapshot.stalled_for,
            stall_threshold_secs,
        ),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Change to apply to the rendered server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDelta<'a> {
    /// Append these lines (possibly none).
    Append(&'a [String]),
    /// The server log shrank: clear the panel, then append these lines.
    Rebuild(&'a [String]),
}

/// Compare the number of server lines already rendered with the snapshot log.
#[must_use]
pub fn log_delta(rendered: usize, logs: &[String]) -> LogDelta<'_> {
    logs.get(rendered..)
        .map_or(LogDelta::Rebuild(logs), LogDelta::Append)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(count: usize) -> Vec<String> {
        (1..=count).map(|n| format!("line {n}")).collect()
    }

    #[test]
    fn clamp_percent_handles_out_of_range_values() {
        assert_eq!(clamp_percent(-12.0), 0);
        assert_eq!(clamp_percent(250.0), 100);
        assert_eq!(clamp_percent(f64::NAN), 0);
        assert_eq!(clamp_percent(f64::INFINITY), 100);
        assert_eq!(clamp_percent(f64::NEG_INFINITY), 0);
        assert_eq!(clamp_percent(41.6), 42);
        assert_eq!(clamp_percent(99.4), 99);
    }

    #[test]
    fn label_combines_percent_and_status() {
        assert_eq!(
            progress_label(42, DownloadStatus::Downloading),
            "42% - Downloading"
        );
        assert_eq!(progress_label(100, DownloadStatus::Completed), "100% - Completed");
    }

    #[test]
    fn stall_note_appears_only_past_threshold() {
        assert_eq!(
            action_text(Some("Downloading fragment 3"), Some(20), 20).as_deref(),
            Some("Downloading fragment 3")
        );
        assert_eq!(
            action_text(Some("Downloading fragment 3"), Some(21), 20).as_deref(),
            Some("Stalled for 21s - Downloading fragment 3")
        );
        assert_eq!(
            action_text(None, Some(45), 20).as_deref(),
            Some("Stalled for 45s")
        );
        assert_eq!(action_text(Some("  "), None, 20), None);
    }

    #[test]
    fn progress_view_fills_placeholders() {
        let snapshot = StatusSnapshot {
            status: DownloadStatus::Downloading,
            progress: 180.0,
            speed: Some(String::new()),
            title: Some("Clip".into()),
            ..StatusSnapshot::default()
        };
        let view = progress_view(&snapshot, 20);
        assert_eq!(view.percent, 100);
        assert_eq!(view.label, "100% - Downloading");
        assert_eq!(view.speed, "-");
        assert_eq!(view.eta, "-");
        assert_eq!(view.title.as_deref(), Some("Clip"));
        assert_eq!(view.action, None);
    }

    #[test]
    fn log_delta_appends_only_the_unseen_suffix() {
        let logs = lines(5);
        assert_eq!(log_delta(3, &logs), LogDelta::Append(&logs[3..]));
        assert_eq!(log_delta(5, &logs), LogDelta::Append(&[]));
        assert_eq!(log_delta(0, &logs), LogDelta::Append(&logs[..]));
    }

    #[test]
    fn log_delta_rebuilds_when_server_log_shrinks() {
        let logs = lines(2);
        assert_eq!(log_delta(4, &logs), LogDelta::Rebuild(&logs[..]));
        assert_eq!(log_delta(4, &[]), LogDelta::Rebuild(&[]));
    }
}
