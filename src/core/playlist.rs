//! Playlist metadata traversal.
//!
//! The browse response is loosely shaped and versioned server-side, so it is
//! navigated as a JSON tree rather than decoded into rigid structs; only the
//! video entries themselves have a stable enough shape to deserialize.

use crate::error::YtError;
use crate::platform::http::{self, ContextInfo};
use crate::platform::innertube::playlist_request;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub videos: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    pub duration: Duration,
}

/// Text nodes appear either as `{"simpleText": ...}` or `{"runs": [{"text": ...}]}`.
fn renderer_text(node: &Value, keys: &[&str]) -> String {
    for key in keys {
        let Some(child) = node.get(key) else { continue };

        if let Some(text) = child.get("simpleText").and_then(Value::as_str) {
            return text.to_string();
        }
        if let Some(text) = child
            .pointer("/runs/0/text")
            .and_then(Value::as_str)
        {
            return text.to_string();
        }
    }
    String::new()
}

/// First value of a single-key object (the renderer wrapper pattern).
fn first_key<'a>(node: &'a Value) -> &'a Value {
    node.as_object()
        .and_then(|map| map.values().next())
        .unwrap_or(&Value::Null)
}

/// Classic continuation shape hanging off a list renderer.
fn list_continuation(node: &Value) -> Option<String> {
    node.pointer("/continuations/0/nextContinuationData/continuation")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct EntryExtractor {
    #[serde(rename = "playlistVideoRenderer")]
    renderer: Option<EntryRenderer>,
    #[serde(rename = "continuationItemRenderer", default)]
    continuation: ContinuationItem,
}

#[derive(Debug, Deserialize)]
struct EntryRenderer {
    #[serde(rename = "videoId", default)]
    video_id: String,
    #[serde(default)]
    title: WithRuns,
    #[serde(rename = "shortBylineText", default)]
    author: WithRuns,
    #[serde(rename = "lengthSeconds", default)]
    length_seconds: String,
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationItem {
    #[serde(rename = "continuationEndpoint", default)]
    endpoint: ContinuationEndpoint,
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationEndpoint {
    #[serde(rename = "continuationCommand", default)]
    command: ContinuationCommand,
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationCommand {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize, Default)]
struct WithRuns {
    #[serde(default)]
    runs: Vec<RunText>,
}

#[derive(Debug, Deserialize, Default)]
struct RunText {
    #[serde(default)]
    text: String,
}

impl WithRuns {
    fn text(&self) -> String {
        self.runs
            .first()
            .map(|run| run.text.clone())
            .unwrap_or_default()
    }
}

/// Decode a contents array into entries plus an optional continuation token.
fn extract_entries(data: &Value) -> Result<(Vec<PlaylistEntry>, String), YtError> {
    let extractors: Vec<EntryExtractor> = serde_json::from_value(data.clone())?;

    let mut entries = Vec::with_capacity(extractors.len());
    let mut continuation = String::new();

    for extractor in extractors {
        let Some(renderer) = extractor.renderer else {
            let token = extractor.continuation.endpoint.command.token;
            if !token.is_empty() {
                continuation = token;
            }
            continue;
        };

        entries.push(PlaylistEntry {
            id: renderer.video_id,
            title: renderer.title.text(),
            author: renderer.author.text(),
            duration: Duration::from_secs(renderer.length_seconds.parse().unwrap_or(0)),
        });
    }

    Ok((entries, continuation))
}

impl Playlist {
    /// Parse the initial browse response, then follow continuation tokens
    /// until the playlist is exhausted.
    pub(crate) async fn parse(
        &mut self,
        ctx: &ContextInfo,
        body: &[u8],
    ) -> Result<(), YtError> {
        let root: Value = serde_json::from_slice(body)?;

        if let Some(renderer) = root.pointer("/alerts/0/alertRenderer") {
            if renderer.get("type").and_then(Value::as_str) == Some("ERROR") {
                let reason = renderer
                    .pointer("/text/runs/0/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Err(YtError::PlaylistStatus { reason });
            }
        }

        let metadata = root
            .get("metadata")
            .or_else(|| root.get("header"))
            .ok_or_else(|| YtError::Extraction("no playlist header / metadata found".into()))?;
        let metadata = metadata
            .get("playlistHeaderRenderer")
            .unwrap_or(metadata);

        self.title = renderer_text(metadata, &["title"]);
        self.description = renderer_text(metadata, &["description", "descriptionText"]);

        self.author = root
            .pointer(
                "/sidebar/playlistSidebarRenderer/items/1\
                 /playlistSidebarSecondaryInfoRenderer/videoOwner\
                 /videoOwnerRenderer/title/runs/0/text",
            )
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if self.author.is_empty() {
            self.author = renderer_text(metadata, &["owner", "ownerText"]);
        }

        let contents = root
            .get("contents")
            .ok_or_else(|| YtError::Extraction("contents not found in json body".into()))?;

        let mut first_part = first_key(contents)
            .pointer("/tabs/0/tabRenderer/content/sectionListRenderer/contents/0")
            .unwrap_or(&Value::Null);
        if let Some(nested) = first_part.pointer("/itemSectionRenderer/contents/0") {
            first_part = nested;
        }

        let list_renderer = first_part
            .pointer("/playlistVideoListRenderer")
            .unwrap_or(&Value::Null);
        let video_contents = list_renderer
            .get("contents")
            .ok_or_else(|| YtError::Extraction("no video data found in JSON".into()))?;

        let (entries, mut continuation) = extract_entries(video_contents)?;
        if continuation.is_empty() {
            continuation = list_continuation(list_renderer).unwrap_or_default();
        }

        if entries.is_empty() {
            return Err(YtError::Extraction("no videos found in playlist".into()));
        }
        self.videos = entries;

        while !continuation.is_empty() {
            continuation = self.fetch_continuation(ctx, &continuation).await?;
        }

        Ok(())
    }

    /// Fetch one continuation page; returns the next token or empty when done.
    async fn fetch_continuation(
        &mut self,
        ctx: &ContextInfo,
        token: &str,
    ) -> Result<String, YtError> {
        debug!(count = self.videos.len(), "following playlist continuation");

        let player = ctx
            .player
            .as_ref()
            .ok_or_else(|| YtError::Validation("context carries no player".into()))?;
        let request = playlist_request(token, true, ctx.profile, player);

        let mut url = ctx.base_url();
        url.set_path("/youtubei/v1/browse");
        let body = http::post_body_bytes(ctx, url, &request).await?;
        let root: Value = serde_json::from_slice(&body)?;

        let mut next = root
            .pointer("/onResponseReceivedActions/0/appendContinuationItemsAction/continuationItems");
        if next.is_none() {
            next = root.pointer("/continuationContents/playlistVideoListContinuation/contents");
        }
        let next = next
            .ok_or_else(|| YtError::Extraction("no continuation items in response".into()))?;

        let (entries, mut token) = extract_entries(next)?;
        if token.is_empty() {
            token = root
                .pointer("/continuationContents/playlistVideoListContinuation")
                .and_then(list_continuation)
                .unwrap_or_default();
        }

        self.videos.extend(entries);
        Ok(token)
    }
}
