//! Outbound request envelope.
//!
//! Every call to the service goes through [`execute`], which layers the
//! client-identity headers, the per-request CONSENT cookie and the 200-only
//! status validation. [`ContextInfo`] threads the active profile, the shared
//! HTTP client and the player through helpers without global state; it is
//! created on call entry, cloned into worker tasks where needed, and dropped
//! on return.

use crate::error::YtError;
use crate::platform::player::Player;
use crate::platform::profiles::YoutubeClient;
use rand::Rng;
use reqwest::cookie::Jar;
use reqwest::header;
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Base URL of the service.
pub const YT_BASE: &str = "https://www.youtube.com";

/// Per-request carrier for the active client identity and player.
#[derive(Clone)]
pub struct ContextInfo {
    pub http: reqwest::Client,
    pub jar: Arc<Jar>,
    pub profile: &'static YoutubeClient,
    pub player: Option<Arc<Player>>,
    pub cancel: CancellationToken,
}

impl ContextInfo {
    pub fn base_url(&self) -> Url {
        Url::parse(YT_BASE).expect("static base URL")
    }
}

/// Refresh the CONSENT cookie in the shared jar with a fresh pseudo-random
/// three-digit suffix in [100, 999].
fn refresh_consent(jar: &Jar) {
    let consent_id: u16 = rand::thread_rng().gen_range(100..1000);
    let cookie = format!(
        "CONSENT=YES+cb.20210328-17-p0.en+FX+{consent_id}; Domain=.youtube.com; Path=/"
    );
    let url = Url::parse(YT_BASE).expect("static base URL");
    jar.add_cookie_str(&cookie, &url);
}

/// Apply the identity headers common to every outbound request.
fn envelope(builder: RequestBuilder, profile: &YoutubeClient) -> RequestBuilder {
    let mut builder = builder
        .header(header::ORIGIN, "https://youtube.com")
        .header("Sec-Fetch-Mode", "navigate");

    if let Some(user_agent) = profile.user_agent {
        builder = builder.header(header::USER_AGENT, user_agent);
    }

    builder
}

/// Execute a request under the envelope, racing it against cancellation.
/// Any status other than 200 is an error; the body is dropped on every path.
pub async fn execute(ctx: &ContextInfo, builder: RequestBuilder) -> Result<Response, YtError> {
    refresh_consent(&ctx.jar);
    let builder = envelope(builder, ctx.profile);

    let response = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(YtError::Cancelled),
        result = builder.send() => result?,
    };

    let status = response.status();
    if status.as_u16() != 200 {
        debug!(status = status.as_u16(), "HTTP request failed");
        return Err(YtError::UnexpectedStatusCode(status.as_u16()));
    }

    debug!(status = status.as_u16(), "HTTP request succeeded");
    Ok(response)
}

/// Read a response body to completion, observing cancellation.
pub async fn read_body(ctx: &ContextInfo, response: Response) -> Result<Vec<u8>, YtError> {
    let bytes = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(YtError::Cancelled),
        result = response.bytes() => result?,
    };
    Ok(bytes.to_vec())
}

/// GET a URL and return the full body.
pub async fn get_body_bytes(ctx: &ContextInfo, url: Url) -> Result<Vec<u8>, YtError> {
    let response = execute(ctx, ctx.http.get(url)).await?;
    read_body(ctx, response).await
}

/// POST a JSON body with the innertube headers and return the response body.
pub async fn post_body_bytes<T: Serialize>(
    ctx: &ContextInfo,
    url: Url,
    body: &T,
) -> Result<Vec<u8>, YtError> {
    let builder = ctx
        .http
        .post(url)
        .header("X-Youtube-Client-Name", ctx.profile.client_id.to_string())
        .header("X-Youtube-Client-Version", ctx.profile.version)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .json(body);

    let response = execute(ctx, builder).await?;
    read_body(ctx, response).await
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::offline_ctx;
    use crate::platform::profiles::client_profile;

    #[test]
    fn test_envelope_headers() {
        let http = reqwest::Client::new();
        let profile = client_profile("WEB").unwrap();
        let request = envelope(http.get("https://www.youtube.com/"), profile)
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get(header::ORIGIN).unwrap(),
            "https://youtube.com"
        );
        assert_eq!(request.headers().get("Sec-Fetch-Mode").unwrap(), "navigate");
        assert!(request.headers().contains_key(header::USER_AGENT));
    }

    #[test]
    fn test_envelope_skips_empty_user_agent() {
        let http = reqwest::Client::new();
        let profile = client_profile("TV_EMBEDDED").unwrap();
        let request = envelope(http.get("https://www.youtube.com/"), profile)
            .build()
            .unwrap();

        assert!(!request.headers().contains_key(header::USER_AGENT));
    }

    #[test]
    fn test_consent_cookie_format() {
        let jar = Jar::default();
        refresh_consent(&jar);

        let url = Url::parse(YT_BASE).unwrap();
        let cookies = reqwest::cookie::CookieStore::cookies(&jar, &url).unwrap();
        let value = cookies.to_str().unwrap().to_string();

        assert!(value.starts_with("CONSENT=YES+cb.20210328-17-p0.en+FX+"));
        let suffix: u16 = value.rsplit('+').next().unwrap().parse().unwrap();
        assert!((100..=999).contains(&suffix), "suffix out of range: {suffix}");
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let ctx = offline_ctx();
        ctx.cancel.cancel();

        let url = Url::parse("http://127.0.0.1:1/unreachable").unwrap();
        let err = get_body_bytes(&ctx, url).await.unwrap_err();
        assert!(matches!(err, YtError::Cancelled));
    }

    #[test]
    fn test_post_headers() {
        let http = reqwest::Client::new();
        let profile = client_profile("WEB").unwrap();
        let request = http
            .post("https://www.youtube.com/youtubei/v1/player")
            .header("X-Youtube-Client-Name", profile.client_id.to_string())
            .header("X-Youtube-Client-Version", profile.version)
            .header(header::CONTENT_TYPE, "application/json")
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get("X-Youtube-Client-Name").unwrap(),
            "1"
        );
        assert_eq!(
            request.headers().get("X-Youtube-Client-Version").unwrap(),
            profile.version
        );
    }
}
