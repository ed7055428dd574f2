//! Innertube API request and response envelopes.
//!
//! The service's web front-end drives an internal JSON RPC surface; the
//! request context mirrors what a browser client would send, down to the
//! locale and timezone fields.

use crate::platform::formats::Format;
use crate::platform::player::Player;
use crate::platform::profiles::YoutubeClient;
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Request body for `/youtubei/v1/player` and `/youtubei/v1/browse`.
/// `video_id`, `browse_id` and `continuation` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Default)]
pub struct InnertubeRequest {
    #[serde(rename = "videoId", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(rename = "browseId", skip_serializing_if = "Option::is_none")]
    pub browse_id: Option<String>,
    #[serde(rename = "continuation", skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    pub context: InnertubeContext,
    #[serde(rename = "playbackContext", skip_serializing_if = "Option::is_none")]
    pub playback_context: Option<PlaybackContext>,
    #[serde(rename = "contentCheckOk", skip_serializing_if = "is_false")]
    pub content_check_ok: bool,
    #[serde(rename = "racyCheckOk", skip_serializing_if = "is_false")]
    pub racy_check_ok: bool,
    #[serde(rename = "params", skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InnertubeContext {
    pub client: InnertubeClientInfo,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InnertubeClientInfo {
    pub hl: String,
    pub gl: String,
    #[serde(rename = "clientName")]
    pub client_name: String,
    #[serde(rename = "clientVersion")]
    pub client_version: String,
    #[serde(rename = "androidSDKVersion", skip_serializing_if = "Option::is_none")]
    pub android_sdk_version: Option<u32>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
    #[serde(rename = "utcOffsetMinutes")]
    pub utc_offset_minutes: i32,
    #[serde(rename = "deviceModel", skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(rename = "visitorData", skip_serializing_if = "Option::is_none")]
    pub visitor_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackContext {
    #[serde(rename = "contentPlaybackContext")]
    pub content_playback_context: ContentPlaybackContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPlaybackContext {
    #[serde(rename = "signatureTimestamp")]
    pub signature_timestamp: u64,
}

/// Build the innertube context for a profile, carrying the player's
/// visitor-data token.
pub fn innertube_context(profile: &YoutubeClient, player: &Player) -> InnertubeContext {
    InnertubeContext {
        client: InnertubeClientInfo {
            hl: "en".to_string(),
            gl: "US".to_string(),
            client_name: profile.name.to_string(),
            client_version: profile.version.to_string(),
            android_sdk_version: profile.sdk_version,
            user_agent: profile.user_agent.map(str::to_string),
            time_zone: "UTC".to_string(),
            utc_offset_minutes: 0,
            device_model: profile.device_model.map(str::to_string),
            visitor_data: match player.visitor_data() {
                "" => None,
                token => Some(token.to_string()),
            },
        },
    }
}

/// Player request: video id plus the playback context carrying the
/// extracted signature timestamp.
pub fn player_request(
    video_id: &str,
    profile: &YoutubeClient,
    player: &Player,
) -> InnertubeRequest {
    InnertubeRequest {
        video_id: Some(video_id.to_string()),
        context: innertube_context(profile, player),
        content_check_ok: true,
        racy_check_ok: true,
        playback_context: Some(PlaybackContext {
            content_playback_context: ContentPlaybackContext {
                signature_timestamp: player.sig_timestamp(),
            },
        }),
        ..Default::default()
    }
}

/// Browse request for a playlist, or a follow-up continuation request.
pub fn playlist_request(
    id: &str,
    continuation: bool,
    profile: &YoutubeClient,
    player: &Player,
) -> InnertubeRequest {
    let context = innertube_context(profile, player);

    if continuation {
        InnertubeRequest {
            continuation: Some(id.to_string()),
            context,
            content_check_ok: true,
            racy_check_ok: true,
            ..Default::default()
        }
    } else {
        InnertubeRequest {
            browse_id: Some(format!("VL{id}")),
            context,
            content_check_ok: true,
            racy_check_ok: true,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Player response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlayerResponseData {
    #[serde(rename = "playabilityStatus", default)]
    pub playability_status: PlayabilityStatus,
    #[serde(rename = "streamingData", default)]
    pub streaming_data: StreamingData,
    #[serde(rename = "videoDetails", default)]
    pub video_details: VideoDetails,
    #[serde(rename = "microformat", default)]
    pub microformat: Microformat,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlayabilityStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "playableInEmbed", default)]
    pub playable_in_embed: bool,
    #[serde(rename = "contextParams", default)]
    pub context_params: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StreamingData {
    #[serde(rename = "expiresInSeconds", default)]
    pub expires_in_seconds: String,
    #[serde(default)]
    pub formats: Vec<Format>,
    #[serde(rename = "adaptiveFormats", default)]
    pub adaptive_formats: Vec<Format>,
    #[serde(rename = "dashManifestUrl", default)]
    pub dash_manifest_url: String,
    #[serde(rename = "hlsManifestUrl", default)]
    pub hls_manifest_url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoDetails {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "lengthSeconds", default)]
    pub length_seconds: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
    #[serde(rename = "shortDescription", default)]
    pub short_description: String,
    #[serde(default)]
    pub thumbnail: ThumbnailList,
    #[serde(rename = "viewCount", default)]
    pub view_count: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "isPrivate", default)]
    pub is_private: bool,
    #[serde(rename = "isLiveContent", default)]
    pub is_live_content: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThumbnailList {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Microformat {
    #[serde(rename = "playerMicroformatRenderer", default)]
    pub renderer: MicroformatRenderer,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MicroformatRenderer {
    #[serde(rename = "lengthSeconds", default)]
    pub length_seconds: String,
    #[serde(rename = "ownerProfileUrl", default)]
    pub owner_profile_url: String,
    #[serde(rename = "externalChannelId", default)]
    pub external_channel_id: String,
    #[serde(rename = "viewCount", default)]
    pub view_count: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "publishDate", default)]
    pub publish_date: String,
    #[serde(rename = "ownerChannelName", default)]
    pub owner_channel_name: String,
    #[serde(rename = "uploadDate", default)]
    pub upload_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::profiles::client_profile;

    fn stub_player() -> Player {
        let mut player = Player::default();
        player.sig_timestamp = 19834;
        player.visitor_data = "CgtWaXNpdG9y".to_string();
        player
    }

    #[test]
    fn test_player_request_serialization() {
        let profile = client_profile("WEB").unwrap();
        let player = stub_player();
        let request = player_request("dQw4w9WgXcQ", profile, &player);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["contentCheckOk"], true);
        assert_eq!(json["racyCheckOk"], true);
        assert_eq!(
            json["playbackContext"]["contentPlaybackContext"]["signatureTimestamp"],
            19834
        );
        assert_eq!(json["context"]["client"]["hl"], "en");
        assert_eq!(json["context"]["client"]["gl"], "US");
        assert_eq!(json["context"]["client"]["timeZone"], "UTC");
        assert_eq!(json["context"]["client"]["clientName"], "WEB");
        assert_eq!(json["context"]["client"]["visitorData"], "CgtWaXNpdG9y");

        // Mutually exclusive identifiers are omitted, not null.
        assert!(json.get("browseId").is_none());
        assert!(json.get("continuation").is_none());
        // Optional client fields absent for WEB.
        assert!(json["context"]["client"].get("androidSDKVersion").is_none());
        assert!(json["context"]["client"].get("deviceModel").is_none());
    }

    #[test]
    fn test_playlist_request_serialization() {
        let profile = client_profile("WEB").unwrap();
        let player = stub_player();

        let browse = playlist_request("PLtest123456789", false, profile, &player);
        let json = serde_json::to_value(&browse).unwrap();
        assert_eq!(json["browseId"], "VLPLtest123456789");
        assert!(json.get("continuation").is_none());
        assert!(json.get("playbackContext").is_none());

        let next = playlist_request("CONT_TOKEN", true, profile, &player);
        let json = serde_json::to_value(&next).unwrap();
        assert_eq!(json["continuation"], "CONT_TOKEN");
        assert!(json.get("browseId").is_none());
    }

    #[test]
    fn test_player_response_parse() {
        let body = serde_json::json!({
            "playabilityStatus": {"status": "OK", "playableInEmbed": true},
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Test Video",
                "lengthSeconds": "212",
                "author": "Tester",
                "viewCount": "1000",
            },
            "streamingData": {
                "formats": [{"itag": 18, "url": "https://example/18", "mimeType": "video/mp4", "bitrate": 500000}],
                "adaptiveFormats": [{"itag": 137, "signatureCipher": "s=abc&url=x", "mimeType": "video/mp4", "bitrate": 900000}],
            }
        })
        .to_string();

        let data: PlayerResponseData = serde_json::from_str(&body).unwrap();
        assert_eq!(data.playability_status.status, "OK");
        assert!(data.playability_status.playable_in_embed);
        assert_eq!(data.video_details.title, "Test Video");
        assert_eq!(data.streaming_data.formats.len(), 1);
        assert_eq!(data.streaming_data.adaptive_formats.len(), 1);
        assert_eq!(data.streaming_data.formats[0].itag, 18);
    }
}
