//! # ytfetch
//!
//! YouTube stream resolver and chunked downloader.
//!
//! The service obfuscates its media URLs behind two per-deploy JavaScript
//! routines (a signature descramble and an n-parameter transform). This
//! crate fetches the deployed player bundle, locates those routines by
//! structure rather than by name, evaluates them in an embedded JavaScript
//! engine, and streams the resulting media through a parallel ranged
//! downloader that reassembles chunks in order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ytfetch::Client::new().await?;
//!     let video = client.get_video("dQw4w9WgXcQ").await?;
//!
//!     let format = video.formats.first();
//!     let (mut reader, total) = client.get_stream(&video, format).await?;
//!
//!     let mut buf = Vec::with_capacity(total as usize);
//!     reader.read_to_end(&mut buf).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod core;
pub mod download;
pub mod error;
pub mod platform;
pub mod utils;

pub use crate::client::{Client, DEFAULT_CLIENT};
pub use crate::core::playlist::{Playlist, PlaylistEntry};
pub use crate::core::video::Video;
pub use crate::download::stream::VideoStream;
pub use crate::error::YtError;
pub use crate::platform::formats::{Format, FormatList};
pub use crate::platform::player::Player;

/// Result type alias for ytfetch operations
pub type Result<T> = std::result::Result<T, YtError>;
