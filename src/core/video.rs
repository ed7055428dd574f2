//! Video metadata and player-response parsing.

use crate::error::YtError;
use crate::platform::formats::FormatList;
use crate::platform::innertube::{PlayerResponseData, Thumbnail};
use crate::platform::profiles::YoutubeClient;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

static PLAYER_RESPONSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var ytInitialPlayerResponse\s*=\s*(\{.+?\});").unwrap());

/// Resolved video metadata plus its downloadable formats.
#[derive(Debug, Clone, Default)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub channel_id: String,
    pub channel_handle: String,
    pub views: u64,
    pub duration: Duration,
    pub publish_date: String,
    pub formats: FormatList,
    pub thumbnails: Vec<Thumbnail>,
    pub dash_manifest_url: String,
    pub hls_manifest_url: String,
    pub(crate) profile: Option<&'static YoutubeClient>,
}

impl Video {
    pub(crate) fn new(id: &str, profile: &'static YoutubeClient) -> Video {
        Video {
            id: id.to_string(),
            profile: Some(profile),
            ..Default::default()
        }
    }

    /// Parse an innertube player response body.
    pub(crate) fn parse_player_response(&mut self, body: &[u8]) -> Result<(), YtError> {
        let data: PlayerResponseData = serde_json::from_slice(body)
            .map_err(|e| YtError::Extraction(format!("unable to parse player response: {e}")))?;

        self.check_playability(&data, false)?;
        self.extract_from_response(data)
    }

    /// Parse the watch-page HTML fallback, scraping the embedded
    /// `ytInitialPlayerResponse` object.
    pub(crate) fn parse_watch_page(&mut self, html: &[u8]) -> Result<(), YtError> {
        let html = String::from_utf8_lossy(html);
        let captures = PLAYER_RESPONSE_RE.captures(&html).ok_or_else(|| {
            YtError::Extraction("no ytInitialPlayerResponse found in the watch page".into())
        })?;

        let data: PlayerResponseData = serde_json::from_str(&captures[1])
            .map_err(|e| YtError::Extraction(format!("unable to parse player response: {e}")))?;

        self.check_playability(&data, true)?;
        self.extract_from_response(data)
    }

    /// Map the playability verdict onto typed errors. The embed gate only
    /// applies to API responses; the watch-page fallback bypasses it.
    fn check_playability(
        &self,
        data: &PlayerResponseData,
        is_video_page: bool,
    ) -> Result<(), YtError> {
        let status = &data.playability_status;
        match status.status.as_str() {
            "OK" => {
                if !is_video_page && !status.playable_in_embed {
                    return Err(YtError::NotPlayableInEmbed);
                }
                Ok(())
            }
            "LOGIN_REQUIRED" => {
                // Same status is used for age-restricted and private videos.
                if status.reason.starts_with("This video is private") {
                    Err(YtError::VideoPrivate)
                } else {
                    Err(YtError::LoginRequired)
                }
            }
            _ => {
                if !is_video_page && !status.playable_in_embed {
                    return Err(YtError::NotPlayableInEmbed);
                }
                Err(YtError::PlayabilityStatus {
                    status: status.status.clone(),
                    reason: status.reason.clone(),
                })
            }
        }
    }

    fn extract_from_response(&mut self, data: PlayerResponseData) -> Result<(), YtError> {
        let details = data.video_details;
        self.title = details.title;
        self.description = details.short_description;
        self.author = details.author;
        self.channel_id = details.channel_id;
        self.thumbnails = details.thumbnail.thumbnails;

        self.views = details.view_count.parse().unwrap_or(0);

        if let Ok(seconds) = details.length_seconds.parse::<u64>() {
            self.duration = Duration::from_secs(seconds);
        }
        if let Ok(seconds) = data.microformat.renderer.length_seconds.parse::<u64>() {
            self.duration = Duration::from_secs(seconds);
        }

        self.publish_date = data.microformat.renderer.publish_date;

        if let Ok(profile_url) = Url::parse(&data.microformat.renderer.owner_profile_url) {
            let path = profile_url.path();
            if path.len() > 1 {
                self.channel_handle = path[1..].to_string();
            }
        }

        let mut formats: Vec<_> = data.streaming_data.formats;
        formats.extend(data.streaming_data.adaptive_formats);
        if formats.is_empty() {
            return Err(YtError::Extraction(
                "no formats found in the server's answer".into(),
            ));
        }

        self.formats = FormatList(formats);
        self.formats.sort_by_bitrate_desc();
        debug!(count = self.formats.len(), "formats extracted");

        self.hls_manifest_url = data.streaming_data.hls_manifest_url;
        self.dash_manifest_url = data.streaming_data.dash_manifest_url;

        Ok(())
    }
}
