//! Error types for ytfetch

use thiserror::Error;

/// Main error type for ytfetch operations
#[derive(Debug, Error)]
pub enum YtError {
    #[error("no video format provided")]
    NoFormat,

    #[error("invalid client")]
    InvalidClient,

    #[error("invalid playlist")]
    InvalidPlaylist,

    #[error("could not load playlist: {reason}")]
    PlaylistStatus { reason: String },

    #[error("video is private")]
    VideoPrivate,

    #[error("login required to view this video")]
    LoginRequired,

    #[error("not playable in embed")]
    NotPlayableInEmbed,

    #[error("cannot playback video, status: {status} reason: {reason}")]
    PlayabilityStatus { status: String, reason: String },

    #[error("unexpected status code: {0}")]
    UnexpectedStatusCode(u16),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("JavaScript evaluation failed: {0}")]
    Evaluation(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
