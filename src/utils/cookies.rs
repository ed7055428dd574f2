//! Netscape cookies.txt loading.
//!
//! Parses the seven tab-separated fields of the Netscape cookie file format
//! (domain, subdomain flag, path, secure flag, expiry, name, value) into the
//! shared reqwest cookie jar. Lines prefixed with `#HttpOnly_` are honoured;
//! other `#` lines and blanks are skipped.

use crate::error::YtError;
use reqwest::cookie::Jar;
use std::path::Path;
use url::Url;

/// A single cookie parsed from a cookies.txt line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

/// Parse the body of a Netscape cookies.txt file.
pub fn parse_cookies_txt(content: &str) -> Vec<ParsedCookie> {
    let mut cookies = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }

        cookies.push(ParsedCookie {
            domain: parts[0].to_string(),
            path: parts[2].to_string(),
            secure: parts[3].eq_ignore_ascii_case("TRUE"),
            name: parts[5].to_string(),
            value: parts[6..].join("\t"),
        });
    }

    cookies
}

/// Load cookies from `path` into `jar`.
pub fn load_cookies(path: &Path, jar: &Jar) -> Result<usize, YtError> {
    let content = std::fs::read_to_string(path)?;
    let cookies = parse_cookies_txt(&content);

    let mut loaded = 0;
    for cookie in &cookies {
        let host = cookie.domain.trim_start_matches('.');
        let scheme = if cookie.secure { "https" } else { "http" };
        let Ok(url) = Url::parse(&format!("{scheme}://{host}/")) else {
            continue;
        };

        let header = format!(
            "{}={}; Domain={}; Path={}",
            cookie.name, cookie.value, cookie.domain, cookie.path
        );
        jar.add_cookie_str(&header, &url);
        loaded += 1;
    }

    Ok(loaded)
}
