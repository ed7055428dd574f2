//! Public facade binding the player, cipher evaluator and downloader.

use crate::core::playlist::Playlist;
use crate::core::video::Video;
use crate::download::stream::{self, VideoStream, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ROUTINES};
use crate::error::YtError;
use crate::platform::formats::Format;
use crate::platform::http::{self, ContextInfo};
use crate::platform::innertube::{player_request, playlist_request};
use crate::platform::player::Player;
use crate::platform::profiles::{client_profile, YoutubeClient};
use crate::utils::cookies;
use crate::utils::url::{extract_playlist_id, extract_video_id, set_query_param};
use reqwest::cookie::Jar;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Profile used when the caller does not pick one.
pub const DEFAULT_CLIENT: &str = "WEB";

/// Entry point for resolving videos, playlists and streams.
pub struct Client {
    http: reqwest::Client,
    jar: Arc<Jar>,
    player: Arc<Player>,
    /// Chunk size for ranged downloads.
    pub chunk_size: u64,
    /// Worker fan-out for ranged downloads.
    pub max_routines: usize,
    cancel: CancellationToken,
}

impl Client {
    /// Create a client and bootstrap the player.
    pub async fn new() -> Result<Client, YtError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .gzip(true)
            .brotli(true)
            .build()?;

        let player = Player::new(&http).await?;
        info!(sig_timestamp = player.sig_timestamp(), "player ready");

        Ok(Client {
            http,
            jar,
            player,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_routines: DEFAULT_MAX_ROUTINES,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_routines(mut self, max_routines: usize) -> Self {
        self.max_routines = max_routines;
        self
    }

    /// Thread a caller-owned cancellation token through every request this
    /// client makes.
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    /// Load Netscape-format cookies into the shared jar.
    pub fn load_cookies(&self, path: &Path) -> Result<usize, YtError> {
        cookies::load_cookies(path, &self.jar)
    }

    fn context(&self, profile: &'static YoutubeClient) -> ContextInfo {
        ContextInfo {
            http: self.http.clone(),
            jar: self.jar.clone(),
            profile,
            player: Some(self.player.clone()),
            cancel: self.cancel.clone(),
        }
    }

    /// Resolve a video from a bare ID or any canonical watch/share URL.
    pub async fn get_video(&self, id: &str) -> Result<Video, YtError> {
        self.get_video_with_client(id, DEFAULT_CLIENT).await
    }

    /// Resolve a video under a specific client profile.
    pub async fn get_video_with_client(
        &self,
        id: &str,
        client_name: &str,
    ) -> Result<Video, YtError> {
        let id = extract_video_id(id)?;
        let profile = client_profile(client_name).ok_or(YtError::InvalidClient)?;
        let ctx = self.context(profile);

        let request = player_request(&id, profile, &self.player);
        let mut url = ctx.base_url();
        url.set_path("/youtubei/v1/player");
        let body = http::post_body_bytes(&ctx, url, &request).await?;

        let mut video = Video::new(&id, profile);
        match video.parse_player_response(&body) {
            Ok(()) => Ok(video),
            Err(YtError::NotPlayableInEmbed) => {
                debug!(id, "not playable in embed, falling back to watch page");

                let mut url = ctx.base_url();
                url.set_path("/watch");
                set_query_param(&mut url, "v", &id);
                set_query_param(&mut url, "bpctr", "9999999999");
                set_query_param(&mut url, "has_verified", "1");

                let html = http::get_body_bytes(&ctx, url).await?;
                video.parse_watch_page(&html)?;
                Ok(video)
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve a playlist, following continuations until exhausted.
    pub async fn get_playlist(&self, url: &str) -> Result<Playlist, YtError> {
        self.get_playlist_with_client(url, DEFAULT_CLIENT).await
    }

    pub async fn get_playlist_with_client(
        &self,
        url: &str,
        client_name: &str,
    ) -> Result<Playlist, YtError> {
        let id = extract_playlist_id(url)?;
        let profile = client_profile(client_name).ok_or(YtError::InvalidClient)?;
        let ctx = self.context(profile);

        let request = playlist_request(&id, false, profile, &self.player);
        let mut browse_url = ctx.base_url();
        browse_url.set_path("/youtubei/v1/browse");
        let body = http::post_body_bytes(&ctx, browse_url, &request).await?;

        let mut playlist = Playlist {
            id,
            ..Default::default()
        };
        playlist.parse(&ctx, &body).await?;
        Ok(playlist)
    }

    /// Decipher a format into its playable URL.
    pub async fn get_stream_url(
        &self,
        _video: &Video,
        format: Option<&Format>,
    ) -> Result<String, YtError> {
        let format = format.ok_or(YtError::NoFormat)?;
        self.player.decipher(&format.url, &format.cipher).await
    }

    /// Open an ordered byte stream for a format. Returns the reader and the
    /// total length (0 when unknown).
    pub async fn get_stream(
        &self,
        video: &Video,
        format: Option<&Format>,
    ) -> Result<(VideoStream, u64), YtError> {
        let format = format.ok_or(YtError::NoFormat)?;
        let url = self.get_stream_url(video, Some(format)).await?;

        let profile = video
            .profile
            .or_else(|| client_profile(DEFAULT_CLIENT))
            .ok_or(YtError::InvalidClient)?;
        let ctx = self.context(profile);

        stream::get_stream(
            ctx,
            Url::parse(&url)?,
            format.content_length,
            self.chunk_size,
            self.max_routines,
        )
        .await
    }
}
