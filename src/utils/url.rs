//! URL utilities for extracting video and playlist IDs

use crate::error::YtError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]{11}$").unwrap());

static PLAYLIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{13,42}$").unwrap());

static PLAYLIST_IN_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[&?]list=([A-Za-z0-9_-]{13,42})(&.*)?$").unwrap());

/// Extract the 11-character video ID from a bare ID or any canonical
/// watch/share/shorts/embed URL.
pub fn extract_video_id(input: &str) -> Result<String, YtError> {
    if VIDEO_ID_RE.is_match(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)
        .map_err(|_| YtError::InvalidUrl(format!("not a video ID or URL: {input}")))?;

    let id = match parsed.host_str() {
        Some("youtu.be") => parsed.path().trim_start_matches('/').to_string(),
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com")
        | Some("music.youtube.com") => {
            let path = parsed.path();
            if path.starts_with("/watch") {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| YtError::InvalidUrl("missing v parameter".to_string()))?
            } else if let Some(rest) = path.strip_prefix("/shorts/") {
                rest.to_string()
            } else if let Some(rest) = path.strip_prefix("/embed/") {
                rest.to_string()
            } else if let Some(rest) = path.strip_prefix("/live/") {
                rest.to_string()
            } else {
                return Err(YtError::InvalidUrl(format!(
                    "unsupported video URL path: {path}"
                )));
            }
        }
        _ => {
            return Err(YtError::InvalidUrl(format!(
                "not a supported video URL: {input}"
            )))
        }
    };

    if VIDEO_ID_RE.is_match(&id) {
        Ok(id)
    } else {
        Err(YtError::InvalidUrl(format!("invalid video ID: {id}")))
    }
}

/// Extract a playlist ID from a bare ID or a URL carrying a `list`
/// query parameter.
pub fn extract_playlist_id(input: &str) -> Result<String, YtError> {
    if PLAYLIST_ID_RE.is_match(input) {
        return Ok(input.to_string());
    }

    if let Some(captures) = PLAYLIST_IN_URL_RE.captures(input) {
        return Ok(captures[1].to_string());
    }

    Err(YtError::InvalidPlaylist)
}

/// Read a single query parameter.
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Set or replace a single query parameter, re-encoding the query.
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut replaced = false;
    let mut mutator = url.query_pairs_mut();
    mutator.clear();
    for (k, v) in &pairs {
        if k == key {
            mutator.append_pair(k, value);
            replaced = true;
        } else {
            mutator.append_pair(k, v);
        }
    }
    if !replaced {
        mutator.append_pair(key, value);
    }
}
