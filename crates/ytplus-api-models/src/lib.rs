#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the YT Downloader Plus backend.
//!
//! The backend is lenient about what it emits (progress arrives as a float, a
//! string such as `"42.5%"`, or occasionally garbage), so the decoders here
//! accept anything plausible and leave range checks to the controller.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// What the backend should fetch for a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Video with merged audio, capped at the requested resolution.
    #[default]
    Video,
    /// Best audio track extracted to MP3.
    Audio,
}

impl DownloadMode {
    /// Wire label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
        }
    }
}

/// Whether the URL points at one item or a whole channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    /// A single video or playlist URL.
    #[default]
    Single,
    /// Every upload (or the most recent uploads) of a channel.
    Channel,
}

/// Channel download breadth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Every video on the channel.
    All,
    /// Only the newest `video_count` videos.
    Recent,
}

/// Body of `POST /api/download`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Trimmed, non-empty source URL.
    pub url: String,
    /// Video or audio extraction.
    pub mode: DownloadMode,
    /// Resolution label such as `Best` or `1080p`; absent for audio downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Destination folder on the backend host; empty selects its default.
    #[serde(default)]
    pub folder: String,
    /// Embed subtitles into the output container.
    #[serde(default)]
    pub subtitles: bool,
    /// Embed the thumbnail as cover art.
    #[serde(default)]
    pub embed_thumbnail: bool,
    /// Single item or channel.
    #[serde(default)]
    pub download_type: DownloadType,
    /// Channel breadth; only present for channel downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_mode: Option<ChannelMode>,
    /// Number of recent videos; only present when `channel_mode` is `recent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u32>,
}

/// Lifecycle label reported by `GET /api/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Nothing queued.
    #[default]
    Idle,
    /// Worker picked up the job but has not reported progress yet.
    Starting,
    /// Bytes are flowing.
    Downloading,
    /// Download finished, post-processing (merge, audio extraction) running.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// Stopped on request.
    Cancelled,
    /// Any label this client does not know about.
    #[serde(other)]
    Unknown,
}

impl DownloadStatus {
    /// Lowercase wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Capitalised label for status displays.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Downloading => "Downloading",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the status ends a download.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl Display for DownloadStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Point-in-time payload returned by `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatusSnapshot {
    /// Whether the backend worker is busy.
    #[serde(default)]
    pub is_downloading: bool,
    /// Lifecycle label.
    #[serde(default)]
    pub status: DownloadStatus,
    /// Raw progress percentage; may be outside `[0, 100]`.
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: f64,
    /// Human-readable transfer rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Human-readable time remaining.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Title of the item being fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// URL of the job the worker is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    /// What the backend is doing right now (e.g. "Merging formats").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    /// Seconds since the backend last saw progress change.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub stalled_for: Option<u64>,
    /// Append-only backend log; a shorter list than before means it was reset.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logs: Vec<String>,
}

/// Body of `POST /api/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoRequest {
    /// URL to describe.
    pub url: String,
}

/// Duration as reported by the metadata endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MediaDuration {
    /// Whole seconds.
    Seconds(u64),
    /// Fractional seconds.
    Fractional(f64),
    /// Already formatted by the backend.
    Text(String),
}

impl Display for MediaDuration {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(seconds) => write_clock(formatter, *seconds),
            Self::Fractional(seconds) => {
                if seconds.is_finite() && *seconds >= 0.0 {
                    write_clock(formatter, whole_seconds(seconds.round()))
                } else {
                    formatter.write_str("-")
                }
            }
            Self::Text(text) => formatter.write_str(text),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(seconds: f64) -> u64 {
    seconds as u64
}

fn write_clock(formatter: &mut Formatter<'_>, seconds: u64) -> fmt::Result {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        write!(formatter, "{hours}:{minutes:02}:{secs:02}")
    } else {
        write!(formatter, "{minutes}:{secs:02}")
    }
}

/// Response of `POST /api/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaInfo {
    /// `false` when the backend could not resolve the URL.
    #[serde(default)]
    pub success: bool,
    /// Item or playlist title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Thumbnail image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Runtime of a single item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<MediaDuration>,
    /// Whether the URL resolves to a collection.
    #[serde(default)]
    pub is_playlist: bool,
    /// Failure text when `success` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error document the backend returns alongside non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiErrorBody {
    /// Present (and `false`) on most error bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Failure text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Informational text some endpoints include instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Interpret an arbitrary JSON value as a percentage.
///
/// Numbers pass through, strings are parsed after trimming whitespace and a
/// trailing `%`. Everything else, including NaN and infinities, yields `0.0`.
#[must_use]
pub fn percent_from_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|percent| percent.is_finite()).unwrap_or(0.0)
}

fn lenient_percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0.0, percent_from_value))
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let seconds = value.as_ref().and_then(|value| match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| whole_seconds(secs.floor()))
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    });
    Ok(seconds)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_decodes_backend_payload() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "is_downloading": true,
            "current_url": "https://youtu.be/abc",
            "progress": 42.5,
            "status": "downloading",
            "speed": "1.2MiB/s",
            "eta": "00:31",
            "title": "Clip",
            "logs": ["[10:00:00] Starting download: https://youtu.be/abc"]
        }))
        .expect("snapshot should decode");

        assert!(snapshot.is_downloading);
        assert_eq!(snapshot.status, DownloadStatus::Downloading);
        assert!((snapshot.progress - 42.5).abs() < f64::EPSILON);
        assert_eq!(snapshot.speed.as_deref(), Some("1.2MiB/s"));
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.stalled_for, None);
    }

    #[test]
    fn snapshot_tolerates_malformed_progress() {
        for (raw, expected) in [
            (json!("37.5%"), 37.5),
            (json!(" 12 "), 12.0),
            (json!("abc"), 0.0),
            (json!(null), 0.0),
            (json!(true), 0.0),
            (json!(-5), -5.0),
            (json!(150), 150.0),
        ] {
            let snapshot: StatusSnapshot =
                serde_json::from_value(json!({ "status": "downloading", "progress": raw }))
                    .expect("snapshot should decode");
            assert!(
                (snapshot.progress - expected).abs() < f64::EPSILON,
                "{raw:?} decoded to {}",
                snapshot.progress
            );
        }
    }

    #[test]
    fn snapshot_defaults_missing_fields() {
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "logs": null })).expect("snapshot should decode");
        assert_eq!(snapshot.status, DownloadStatus::Idle);
        assert!(!snapshot.is_downloading);
        assert!(snapshot.logs.is_empty());
    }

    #[test]
    fn stalled_for_accepts_numbers_and_strings() {
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "stalled_for": 31.9 })).expect("float seconds");
        assert_eq!(snapshot.stalled_for, Some(31));
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "stalled_for": "25" })).expect("string seconds");
        assert_eq!(snapshot.stalled_for, Some(25));
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "stalled_for": -3 })).expect("negative seconds");
        assert_eq!(snapshot.stalled_for, None);
    }

    #[test]
    fn unknown_status_maps_to_unknown() {
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({ "status": "paused" })).expect("snapshot should decode");
        assert_eq!(snapshot.status, DownloadStatus::Unknown);
        assert!(!snapshot.status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Error.is_terminal());
        assert!(DownloadStatus::Cancelled.is_terminal());
        assert!(!DownloadStatus::Processing.is_terminal());
        assert_eq!(DownloadStatus::Cancelled.label(), "Cancelled");
    }

    #[test]
    fn audio_request_omits_resolution_and_channel_fields() {
        let request = DownloadRequest {
            url: "abc".into(),
            mode: DownloadMode::Audio,
            resolution: None,
            folder: String::new(),
            subtitles: false,
            embed_thumbnail: true,
            download_type: DownloadType::Single,
            channel_mode: None,
            video_count: None,
        };
        let value = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(
            value,
            json!({
                "url": "abc",
                "mode": "Audio",
                "folder": "",
                "subtitles": false,
                "embed_thumbnail": true,
                "download_type": "single"
            })
        );
    }

    #[test]
    fn media_duration_formats_as_clock() {
        assert_eq!(MediaDuration::Seconds(59).to_string(), "0:59");
        assert_eq!(MediaDuration::Seconds(3_725).to_string(), "1:02:05");
        assert_eq!(MediaDuration::Fractional(61.6).to_string(), "1:02");
        assert_eq!(MediaDuration::Text("12:00".into()).to_string(), "12:00");
    }

    #[test]
    fn media_info_decodes_failure_body() {
        let info: MediaInfo = serde_json::from_value(json!({
            "success": false,
            "error": "Unsupported URL"
        }))
        .expect("info should decode");
        assert!(!info.success);
        assert_eq!(info.error.as_deref(), Some("Unsupported URL"));
        assert!(info.duration.is_none());
    }
}
