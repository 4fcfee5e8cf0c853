//! Download form validation.
//!
//! # Design
//! - Raw form fields stay strings so a UI can hand them over verbatim.
//! - Validation either yields a wire-ready request or a message to show inline.

use ytplus_api_models::{ChannelMode, DownloadMode, DownloadRequest, DownloadType};

use crate::config::DEFAULT_VIDEO_COUNT;
use crate::error::{ControllerError, ControllerResult};

/// Resolution label used when the form leaves it blank.
pub const DEFAULT_RESOLUTION: &str = "Best";

/// Download form contents as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadForm {
    /// Source URL, possibly padded with whitespace.
    pub url: String,
    /// Video or audio.
    pub mode: DownloadMode,
    /// Resolution label; ignored for audio.
    pub resolution: String,
    /// Destination folder on the backend host.
    pub folder: String,
    /// Embed subtitles.
    pub subtitles: bool,
    /// Embed the thumbnail.
    pub embed_thumbnail: bool,
    /// Single item or channel.
    pub download_type: DownloadType,
    /// Channel breadth; required for channel downloads.
    pub channel_mode: Option<ChannelMode>,
    /// Raw "number of recent videos" input.
    pub video_count: Option<String>,
}

impl DownloadForm {
    /// Form for a single video at the best resolution.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            ..Self::default()
        }
    }

    /// Validate the form and build the request body.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Validation`] when the URL is blank or a
    /// channel download lacks its channel mode.
    pub fn validate(&self) -> ControllerResult<DownloadRequest> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ControllerError::validation("Please enter a video URL!"));
        }

        let resolution = match self.mode {
            DownloadMode::Audio => None,
            DownloadMode::Video => {
                let trimmed = self.resolution.trim();
                Some(if trimmed.is_empty() {
                    DEFAULT_RESOLUTION.to_string()
                } else {
                    trimmed.to_string()
                })
            }
        };

        let (channel_mode, video_count) = match self.download_type {
            DownloadType::Single => (None, None),
            DownloadType::Channel => {
                let mode = self.channel_mode.ok_or_else(|| {
                    ControllerError::validation(
                        "Choose whether to download all channel videos or only recent ones",
                    )
                })?;
                let count = match mode {
                    ChannelMode::All => None,
                    ChannelMode::Recent => Some(parse_video_count(self.video_count.as_deref())),
                };
                (Some(mode), count)
            }
        };

        Ok(DownloadRequest {
            url: url.to_string(),
            mode: self.mode,
            resolution,
            folder: self.folder.trim().to_string(),
            subtitles: self.subtitles,
            embed_thumbnail: self.embed_thumbnail,
            download_type: self.download_type,
            channel_mode,
            video_count,
        })
    }
}

/// Parse the "recent videos" count, falling back to the default for blank,
/// unparsable or zero input.
#[must_use]
pub fn parse_video_count(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_VIDEO_COUNT)
}
