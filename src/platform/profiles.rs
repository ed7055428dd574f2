//! Service-recognised client identity profiles.
//!
//! Each profile carries the innertube client name/version pair the service
//! expects, the numeric client ID sent in `X-Youtube-Client-Name`, and the
//! optional user agent / device fields some identities require. Profiles are
//! selected by short name and are immutable once selected for a request.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Configuration record for one service-recognised client identity.
#[derive(Debug, Clone, Default)]
pub struct YoutubeClient {
    /// Innertube `clientName` value, e.g. "WEB_REMIX".
    pub name: &'static str,
    /// Innertube `clientVersion` value.
    pub version: &'static str,
    /// Numeric client ID for the `X-Youtube-Client-Name` header.
    pub client_id: u16,
    pub api_key: Option<&'static str>,
    pub user_agent: Option<&'static str>,
    pub device_model: Option<&'static str>,
    pub sdk_version: Option<u32>,
}

/// Profile table keyed by short name.
pub static CLIENTS: LazyLock<HashMap<&'static str, YoutubeClient>> = LazyLock::new(|| {
    HashMap::from([
        (
            "WEB",
            YoutubeClient {
                name: "WEB",
                version: "2.20250122.04.00",
                client_id: 1,
                user_agent: Some(
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                ),
                ..Default::default()
            },
        ),
        (
            "MWEB",
            YoutubeClient {
                name: "MWEB",
                version: "2.20250122.06.00",
                client_id: 2,
                user_agent: Some(
                    "Mozilla/5.0 (iPad; CPU OS 16_7_10 like Mac OS X) AppleWebKit/605.1.15 \
                     (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
                ),
                ..Default::default()
            },
        ),
        (
            "YTMUSIC",
            YoutubeClient {
                name: "WEB_REMIX",
                version: "1.20250122.01.00",
                client_id: 67,
                ..Default::default()
            },
        ),
        (
            "WEB_EMBEDDED",
            YoutubeClient {
                name: "WEB_EMBEDDED_PLAYER",
                version: "1.20250121.00.00",
                client_id: 56,
                ..Default::default()
            },
        ),
        (
            "TV",
            YoutubeClient {
                name: "TVHTML5",
                version: "7.20250122.15.00",
                client_id: 7,
                user_agent: Some(
                    "Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version",
                ),
                ..Default::default()
            },
        ),
        (
            "TV_EMBEDDED",
            YoutubeClient {
                name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
                version: "2.0",
                client_id: 85,
                ..Default::default()
            },
        ),
        (
            "WEB_KIDS",
            YoutubeClient {
                name: "WEB_KIDS",
                version: "2.20250122.00.00",
                client_id: 76,
                ..Default::default()
            },
        ),
    ])
});

/// Look up a profile by its short name.
pub fn client_profile(name: &str) -> Option<&'static YoutubeClient> {
    CLIENTS.get(name)
}

/// Map an innertube `clientName` (the `c` query parameter of stream URLs)
/// back to the profile short name.
pub fn profile_for_client_name(client_name: &str) -> Option<&'static str> {
    match client_name {
        "WEB" => Some("WEB"),
        "MWEB" => Some("MWEB"),
        "WEB_REMIX" => Some("YTMUSIC"),
        "WEB_KIDS" => Some("WEB_KIDS"),
        "TVHTML5" => Some("TV"),
        "TVHTML5_SIMPLY_EMBEDDED_PLAYER" => Some("TV_EMBEDDED"),
        "WEB_EMBEDDED_PLAYER" => Some("WEB_EMBEDDED"),
        _ => None,
    }
}

/// Browser user agents rotated for the player JS fetch.
static USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Pick a random browser user agent. Per-request, not per-process.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}
