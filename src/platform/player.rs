//! Player bootstrap: fetches the service's player JavaScript and extracts
//! the pieces needed to decipher stream URLs.
//!
//! The player bundle rotates on every deploy, identified by a short hash
//! (the player-id) disclosed by `/iframe_api`. Bootstrapped players are
//! memoised per player-id for five minutes; the n-parameter results they
//! produce are cached without bound since the transform is a pure function
//! of its input for a given player.

use crate::error::YtError;
use crate::platform::ast::{
    find_function, find_variable, FindFunctionArgs, FindVariableArgs, FoundFunction, FoundVariable,
};
use crate::platform::http::YT_BASE;
use crate::platform::profiles::random_user_agent;
use crate::utils::cache::MemoryCache;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

static PLAYER_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"player\\/(\w+)\\/").unwrap());

static SIG_TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"signatureTimestamp:(\d+),").unwrap());

static SIG_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"function\(([A-Za-z_0-9]+)\)\{([A-Za-z_0-9]+=[A-Za-z_0-9]+\.split\(""\)(.+?)\.join\(""\))\}"#)
        .unwrap()
});

static NSIG_CHECK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"if\(typeof (.+?)===.+?\)return").unwrap());

/// String fingerprints that identify the obfuscator's global lookup table.
/// Brittle by nature; extend as the service rotates its obfuscation.
const GLOBAL_VAR_FINGERPRINTS: &[&str] = &["-_w8_"];

/// Substring probes for the n-parameter transform, tried in priority order.
/// The first entry is parametrised on the global-variable name.
const NSIG_PROBES: &[&str] = &[
    ".push(String.fromCharCode(",
    ".reverse().forEach(function",
    "-_w8_",
    "1969",
];

/// Process-wide player cache: player-id → bootstrapped player.
static PLAYER_CACHE: LazyLock<MemoryCache<String, Arc<Player>>> =
    LazyLock::new(|| MemoryCache::new(Duration::from_secs(300), Duration::from_secs(600)));

/// Process-wide n-parameter cache: raw `n` input → transformed value.
/// Unbounded and never expiring.
pub(crate) static NSIG_CACHE: LazyLock<moka::sync::Cache<String, String>> =
    LazyLock::new(|| moka::sync::Cache::builder().build());

/// Extracted deciphering state for one deployed player version.
#[derive(Debug, Default)]
pub struct Player {
    pub(crate) sig_timestamp: u64,
    /// Composed signature-descramble program; evaluates to the descrambled
    /// signature when a global `sig` is pre-set.
    pub(crate) sig_source: String,
    /// N-parameter transform program; defines (but does not call) the
    /// function named by `nsig_name`.
    pub(crate) nsig_source: String,
    pub(crate) nsig_name: String,
    /// Identifier the n-param function probes with `typeof … === "undefined"`.
    pub(crate) nsig_check: String,
    pub(crate) visitor_data: String,
}

impl Player {
    /// Bootstrap a player, reusing a cached one when the deployed player-id
    /// was seen within the last five minutes.
    pub async fn new(http: &reqwest::Client) -> Result<Arc<Player>, YtError> {
        let visitor_data = fetch_visitor_data(http).await?;

        let iframe_url = join_base("/iframe_api")?;
        let iframe_js = get_text(http, iframe_url, None).await?;

        let Some(captures) = PLAYER_ID_RE.captures(&iframe_js) else {
            // No player-id disclosed; pre-signed URLs still work.
            warn!("player id not found in iframe API response");
            return Ok(Arc::new(Player {
                visitor_data,
                ..Default::default()
            }));
        };
        let player_id = captures[1].to_string();

        if let Some(cached) = PLAYER_CACHE.get(&player_id) {
            debug!(player_id, "player cache hit");
            return Ok(cached);
        }

        debug!(player_id, "fetching player JS");
        let player_url = join_base(&format!(
            "/s/player/{player_id}/player_ias.vflset/en_US/base.js"
        ))?;
        let player_js = get_text(http, player_url, Some(random_user_agent())).await?;

        let player = Arc::new(Self::from_player_js(&player_js, visitor_data)?);
        PLAYER_CACHE.insert(player_id, player.clone());

        Ok(player)
    }

    /// Extract all deciphering state from the player JS body.
    pub(crate) fn from_player_js(player_js: &str, visitor_data: String) -> Result<Player, YtError> {
        let global_var = extract_global_variable(player_js)?;
        if let Some(var) = &global_var {
            debug!(name = %var.name, "global lookup table found");
        }

        let sig_timestamp = extract_sig_timestamp(player_js)?;
        let sig_source = extract_sig_source(player_js, global_var.as_ref())?;
        let (nsig_name, nsig_source) = extract_nsig_source(player_js, global_var.as_ref())?;

        let nsig_check = NSIG_CHECK_RE
            .captures(&nsig_source)
            .map(|captures| captures[1].to_string())
            .unwrap_or_default();

        Ok(Player {
            sig_timestamp,
            sig_source,
            nsig_source,
            nsig_name,
            nsig_check,
            visitor_data,
        })
    }

    pub fn sig_timestamp(&self) -> u64 {
        self.sig_timestamp
    }

    pub fn visitor_data(&self) -> &str {
        &self.visitor_data
    }
}

fn join_base(path: &str) -> Result<Url, YtError> {
    let base = Url::parse(YT_BASE)?;
    Ok(base.join(path)?)
}

/// Plain GET used during bootstrap; these requests carry no client-identity
/// envelope, only an optional browser user agent.
async fn get_text(
    http: &reqwest::Client,
    url: Url,
    user_agent: Option<&str>,
) -> Result<String, YtError> {
    let mut builder = http.get(url);
    if let Some(user_agent) = user_agent {
        builder = builder.header(reqwest::header::USER_AGENT, user_agent);
    }

    let response = builder.send().await?;
    let status = response.status();
    if status.as_u16() != 200 {
        return Err(YtError::UnexpectedStatusCode(status.as_u16()));
    }

    Ok(response.text().await?)
}

/// Fetch the visitor-data token from `/sw.js_data`: a JSON body behind a
/// 6-byte safety prefix, with the token at array path `[0][2][0][0][13]`.
async fn fetch_visitor_data(http: &reqwest::Client) -> Result<String, YtError> {
    let url = join_base("/sw.js_data")?;
    let body = get_text(http, url, None).await?;

    parse_visitor_data(body.as_bytes())
}

pub(crate) fn parse_visitor_data(body: &[u8]) -> Result<String, YtError> {
    let not_found = || YtError::Validation("visitor data not found in expected structure".into());

    if body.len() < 6 {
        return Err(not_found());
    }

    let data: serde_json::Value = serde_json::from_slice(&body[6..])?;
    data.get(0)
        .and_then(|level| level.get(2))
        .and_then(|level| level.get(0))
        .and_then(|level| level.get(0))
        .and_then(|level| level.get(13))
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(not_found)
}

/// Locate the obfuscator's global string-lookup table by fingerprint.
/// Absent on older player versions; that is not an error.
fn extract_global_variable(player_js: &str) -> Result<Option<FoundVariable>, YtError> {
    for fingerprint in GLOBAL_VAR_FINGERPRINTS {
        let found = find_variable(
            player_js,
            &FindVariableArgs {
                includes: Some(fingerprint.to_string()),
                ..Default::default()
            },
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn extract_sig_timestamp(player_js: &str) -> Result<u64, YtError> {
    let captures = SIG_TIMESTAMP_RE
        .captures(player_js)
        .ok_or_else(|| YtError::Extraction("signature timestamp not found".into()))?;

    Ok(captures[1].parse()?)
}

/// Build the signature-descramble program.
///
/// The descramble function splits the signature, applies a chain of calls
/// off a helper object, and joins. The helper object's members are inlined
/// so the composed source is self-contained:
/// `<global var>; function descramble_sig(p) { let obj={...}; <body> } descramble_sig(sig);`
fn extract_sig_source(
    player_js: &str,
    global_var: Option<&FoundVariable>,
) -> Result<String, YtError> {
    let (param, body, chain) = match SIG_SOURCE_RE.captures(player_js) {
        Some(captures) => (
            captures[1].to_string(),
            captures[2].to_string(),
            captures[3].to_string(),
        ),
        None => return extract_sig_source_lookup(player_js, global_var),
    };

    let helper = helper_object_name(&chain)
        .ok_or_else(|| YtError::Extraction("descramble helper object name not found".into()))?;
    let members = helper_object_members(player_js, &helper)?;

    let descramble = format!(
        "function descramble_sig({param}) {{ let {helper}={{{members}}}; {body} }} descramble_sig(sig);"
    );

    Ok(prepend_global_var(global_var, &descramble))
}

/// Fallback for the further-obfuscated form in which the descramble
/// function reaches every method through the global lookup table,
/// e.g. `x=x[gv[14]](gv[0])`.
fn extract_sig_source_lookup(
    player_js: &str,
    global_var: Option<&FoundVariable>,
) -> Result<String, YtError> {
    let var = global_var
        .ok_or_else(|| YtError::Extraction("signature descramble function not found".into()))?;
    let name = regex::escape(&var.name);

    let lookup_re = Regex::new(&format!(
        r"function\(([A-Za-z_0-9]+)\)\{{([A-Za-z_0-9]+=[A-Za-z_0-9]+\[{name}\[\d+\]\]\({name}\[\d+\]\)(.+?)\[{name}\[\d+\]\]\({name}\[\d+\]\))\}}"
    ))?;

    let captures = lookup_re.captures(player_js).ok_or_else(|| {
        YtError::Extraction("signature descramble function not found (lookup form)".into())
    })?;

    let param = &captures[1];
    let body = &captures[2];
    let chain = &captures[3];

    let helper = helper_object_name(chain)
        .ok_or_else(|| YtError::Extraction("descramble helper object name not found".into()))?;
    let members = helper_object_members(player_js, &helper)?;

    let descramble = format!(
        "function descramble_sig({param}) {{ let {helper}={{{members}}}; {body} }} descramble_sig(sig);"
    );

    Ok(prepend_global_var(global_var, &descramble))
}

/// The helper object's name is the first path segment of the chained call
/// text, with any statement separator stripped.
fn helper_object_name(chain: &str) -> Option<String> {
    let first = chain.split(['.', '[']).next()?;
    let name = first.replace(';', "").trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Extract the member list of `var <name>={...};` (fallback: without `var`).
fn helper_object_members(player_js: &str, name: &str) -> Result<String, YtError> {
    let escaped = regex::escape(name);

    let with_var = Regex::new(&format!(r"(?s)var {escaped}=\{{(.*?)\}};"))?;
    if let Some(captures) = with_var.captures(player_js) {
        return Ok(captures[1].to_string());
    }

    let without_var = Regex::new(&format!(r"(?s){escaped}=\{{(.*?)\}};"))?;
    if let Some(captures) = without_var.captures(player_js) {
        return Ok(captures[1].to_string());
    }

    Err(YtError::Extraction(format!(
        "descramble helper object {name} not found"
    )))
}

/// Locate the n-parameter transform function by probing in priority order,
/// then prepend the global-variable source so its dependencies resolve.
fn extract_nsig_source(
    player_js: &str,
    global_var: Option<&FoundVariable>,
) -> Result<(String, String), YtError> {
    let mut probes: Vec<String> = Vec::with_capacity(NSIG_PROBES.len() + 1);
    if let Some(var) = global_var {
        probes.push(format!("new Date({}", var.name));
    }
    probes.extend(NSIG_PROBES.iter().map(|probe| probe.to_string()));

    for probe in &probes {
        let found: Option<FoundFunction> = find_function(
            player_js,
            &FindFunctionArgs {
                includes: Some(probe.clone()),
                ..Default::default()
            },
        )?;

        if let Some(function) = found {
            debug!(probe = %probe, name = %function.name, "n-param function found");
            let source = prepend_global_var(global_var, &function.source);
            return Ok((function.name, source));
        }
    }

    Err(YtError::Extraction(
        "n-param transform function not found".into(),
    ))
}

fn prepend_global_var(global_var: Option<&FoundVariable>, code: &str) -> String {
    match global_var {
        Some(var) => format!("{}; {}", var.source, code),
        None => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A miniature player JS with the same structural landmarks as the
    /// production bundle.
    const PLAYER_JS: &str = concat!(
        r#"var _yt={};(function(g){"#,
        r#"var Wo="reverse;splice;-_w8_;join".split(";");"#,
        r#"Xa=function(a){if(typeof Wo==="undefined")return a;var b=a.split("");b.push(String.fromCharCode(46));return b.join("")};"#,
        r#"g.extra=function(){return new Date().getTime()}"#,
        r#"})(_yt);"#,
        "\n",
        r#"var config={signatureTimestamp:19834,other:1};"#,
        "\n",
        r#"var Nw={aB:function(a){a.reverse()},cD:function(a,b){a.splice(0,b)}};"#,
        r#"var descrambler=function(N){N=N.split("");Nw.aB(N,2);Nw.cD(N,3);return N.join("")};"#,
    );

    #[test]
    fn test_parse_visitor_data() {
        let token = "CgtzbW9rZV90ZXN0";
        let mut level4 = vec![serde_json::Value::Null; 14];
        level4[13] = serde_json::Value::String(token.to_string());
        let data = serde_json::json!([[null, null, [[level4]]]]);

        // 6-byte safety prefix ahead of the JSON payload.
        let body = format!(")]}}'\n\n{data}");
        assert_eq!(parse_visitor_data(body.as_bytes()).unwrap(), token);
    }

    #[test]
    fn test_parse_visitor_data_wrong_shape() {
        let body = b")]}'\n\n[[null,null,[]]]";
        let err = parse_visitor_data(body).unwrap_err();
        assert!(err
            .to_string()
            .contains("visitor data not found in expected structure"));

        assert!(parse_visitor_data(b"tiny").is_err());
    }

    #[test]
    fn test_player_id_regex() {
        let body = r#"var scriptUrl = 'https:\/\/www.youtube.com\/s\/player\/14397e62\/www-widgetapi.vflset\/www-widgetapi.js';"#;
        let captures = PLAYER_ID_RE.captures(body).unwrap();
        assert_eq!(&captures[1], "14397e62");
    }

    #[test]
    fn test_extract_sig_timestamp() {
        assert_eq!(extract_sig_timestamp(PLAYER_JS).unwrap(), 19834);
        assert!(extract_sig_timestamp("no timestamp here").is_err());
    }

    #[test]
    fn test_extract_global_variable() {
        let var = extract_global_variable(PLAYER_JS).unwrap().unwrap();
        assert_eq!(var.name, "Wo");
        assert_eq!(var.source, r#"Wo="reverse;splice;-_w8_;join".split(";")"#);

        assert!(extract_global_variable("aa=function(a){return a};")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_extract_sig_source() {
        let global_var = extract_global_variable(PLAYER_JS).unwrap();
        let source = extract_sig_source(PLAYER_JS, global_var.as_ref()).unwrap();

        assert!(source.starts_with(r#"Wo="reverse;splice;-_w8_;join".split(";"); "#));
        assert!(source.contains("function descramble_sig(N)"));
        assert!(source.contains("let Nw={aB:function(a){a.reverse()},cD:function(a,b){a.splice(0,b)}}"));
        assert!(source.contains(r#"N=N.split("");Nw.aB(N,2);Nw.cD(N,3);return N.join("")"#));
        assert!(source.ends_with("descramble_sig(sig);"));
    }

    #[test]
    fn test_extract_sig_source_missing() {
        let err = extract_sig_source("var x=1;", None).unwrap_err();
        assert!(matches!(err, YtError::Extraction(_)));
    }

    #[test]
    fn test_extract_nsig_source() {
        let global_var = extract_global_variable(PLAYER_JS).unwrap();
        let (name, source) = extract_nsig_source(PLAYER_JS, global_var.as_ref()).unwrap();

        assert_eq!(name, "Xa");
        // Global var prepended so the function's dependencies resolve.
        assert!(source.starts_with(r#"Wo="reverse;splice;-_w8_;join".split(";"); "#));
        assert!(source.contains("Xa=function(a)"));
    }

    #[test]
    fn test_extract_nsig_probe_priority() {
        // Two candidates; `new Date(<gv>` outranks the fromCharCode probe.
        let js = concat!(
            r#"var _p={};(function(g){"#,
            r#"var Qq="x;-_w8_;y".split(";");"#,
            r#"Aa=function(a){return a.push(String.fromCharCode(1))};"#,
            r#"Bb=function(a){return new Date(Qq[0]).getTime()+a}"#,
            r#"})(_p);"#
        );
        let global_var = extract_global_variable(js).unwrap();
        let (name, _) = extract_nsig_source(js, global_var.as_ref()).unwrap();
        assert_eq!(name, "Bb");
    }

    #[test]
    fn test_extract_nsig_not_found() {
        let err = extract_nsig_source("var x=1;", None).unwrap_err();
        assert!(matches!(err, YtError::Extraction(_)));
    }

    #[test]
    fn test_nsig_check_guard() {
        let player = Player::from_player_js(PLAYER_JS, String::new()).unwrap();
        assert_eq!(player.nsig_check, "Wo");
        assert_eq!(player.nsig_name, "Xa");
        assert_eq!(player.sig_timestamp, 19834);
    }

    #[test]
    fn test_player_cache_returns_same_object() {
        let player = Arc::new(Player {
            visitor_data: "v".to_string(),
            ..Default::default()
        });
        PLAYER_CACHE.insert("test_player_id".to_string(), player.clone());

        let first = PLAYER_CACHE.get(&"test_player_id".to_string()).unwrap();
        let second = PLAYER_CACHE.get(&"test_player_id".to_string()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &player));
    }
}
