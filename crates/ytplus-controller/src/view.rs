//! UI adapter contract and the view models handed to it.

use std::sync::Arc;

use serde::Serialize;
use ytplus_api_models::{DownloadStatus, MediaInfo};

/// Which controls are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Submit enabled, cancel disabled.
    Idle,
    /// A start request is in flight; submit and cancel disabled.
    Submitting,
    /// A download is running; submit disabled, cancel enabled.
    Active,
}

/// Severity of a log panel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// Something the user asked for worked.
    Success,
    /// Heads-up that needs no action.
    Warning,
    /// Something failed.
    Error,
}

/// Where a log panel entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrigin {
    /// A line from the backend's log.
    Server,
    /// A notice raised by the controller.
    Local,
}

/// One line in the log panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Severity used for styling.
    pub level: NoticeLevel,
    /// Origin of the line.
    pub origin: LogOrigin,
    /// Text to show.
    pub message: String,
}

impl LogEntry {
    /// Backend log line.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            origin: LogOrigin::Server,
            message: message.into(),
        }
    }

    /// Controller notice.
    #[must_use]
    pub fn local(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            origin: LogOrigin::Local,
            message: message.into(),
        }
    }
}

/// Everything the progress surface shows for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    /// Whole percent in `0..=100`.
    pub percent: u8,
    /// Backend lifecycle state.
    pub status: DownloadStatus,
    /// Percentage and status word, e.g. `42% - Downloading`.
    pub label: String,
    /// Transfer rate or `-`.
    pub speed: String,
    /// Time remaining or `-`.
    pub eta: String,
    /// Title of the current item.
    pub title: Option<String>,
    /// Current action, prefixed with a stall note when stalled.
    pub action: Option<String>,
}

/// Metadata preview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewView {
    /// Item or playlist title.
    pub title: String,
    /// `Playlist` or `Video`, with the duration appended when known.
    pub meta: String,
    /// Thumbnail URL; `None` means the image element is left out.
    pub thumbnail: Option<String>,
}

impl PreviewView {
    /// Build the preview card from a successful metadata response.
    #[must_use]
    pub fn from_info(info: &MediaInfo) -> Self {
        let kind = if info.is_playlist { "Playlist" } else { "Video" };
        let meta = match &info.duration {
            Some(duration) => format!("{kind} - {duration}"),
            None => kind.to_string(),
        };
        let thumbnail = info
            .thumbnail
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        Self {
            title: info
                .title
                .clone()
                .unwrap_or_else(|| "Untitled".to_string()),
            meta,
            thumbnail,
        }
    }
}

/// Whether the UI surface is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Shown; polling runs.
    Visible,
    /// Hidden; polling is suspended.
    Hidden,
}

/// Rendering side of the UI.
///
/// Methods take `&self` and are called from the poll task as well as from
/// event handlers, so implementations synchronise internally. They must not
/// call back into the controller.
pub trait StatusView: Send + Sync {
    /// Enable or disable submit/cancel according to `state`.
    fn set_controls(&self, state: ControlState);
    /// Enable the resolution picker (video) or disable it (audio).
    fn set_resolution_enabled(&self, enabled: bool);
    /// Reveal the progress surface.
    fn show_progress(&self);
    /// Render the latest snapshot.
    fn render_progress(&self, progress: &ProgressView);
    /// Append one line to the log panel.
    fn append_log(&self, entry: &LogEntry);
    /// Remove every line from the log panel.
    fn clear_log(&self);
    /// Toggle the preview trigger's busy state.
    fn set_preview_busy(&self, busy: bool);
    /// Show the metadata preview card.
    fn show_preview(&self, preview: &PreviewView);
}

impl<T: StatusView + ?Sized> StatusView for Arc<T> {
    fn set_controls(&self, state: ControlState) {
        (**self).set_controls(state);
    }

    fn set_resolution_enabled(&self, enabled: bool) {
        (**self).set_resolution_enabled(enabled);
    }

    fn show_progress(&self) {
        (**self).show_progress();
    }

    fn render_progress(&self, progress: &ProgressView) {
        (**self).render_progress(progress);
    }

    fn append_log(&self, entry: &LogEntry) {
        (**self).append_log(entry);
    }

    fn clear_log(&self) {
        (**self).clear_log();
    }

    fn set_preview_busy(&self, busy: bool) {
        (**self).set_preview_busy(busy);
    }

    fn show_preview(&self, preview: &PreviewView) {
        (**self).show_preview(preview);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytplus_api_models::MediaDuration;

    #[test]
    fn preview_omits_missing_or_blank_thumbnail() {
        let mut info = MediaInfo {
            success: true,
            title: Some("Clip".into()),
            thumbnail: None,
            duration: Some(MediaDuration::Seconds(95)),
            is_playlist: false,
            error: None,
        };
        let preview = PreviewView::from_info(&info);
        assert_eq!(preview.thumbnail, None);
        assert_eq!(preview.meta, "Video - 1:35");

        info.thumbnail = Some("  ".into());
        assert_eq!(PreviewView::from_info(&info).thumbnail, None);

        info.thumbnail = Some("https://i.ytimg.com/vi/abc/hq.jpg".into());
        assert_eq!(
            PreviewView::from_info(&info).thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/abc/hq.jpg")
        );
    }

    #[test]
    fn preview_labels_playlists_without_duration() {
        let info = MediaInfo {
            success: true,
            title: Some("Mix".into()),
            is_playlist: true,
            ..MediaInfo::default()
        };
        let preview = PreviewView::from_info(&info);
        assert_eq!(preview.meta, "Playlist");
        assert_eq!(preview.title, "Mix");
    }
}
