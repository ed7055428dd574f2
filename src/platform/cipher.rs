//! Signature and n-parameter deciphering.
//!
//! Stream URLs arrive in one of two shapes: pre-signed (ready to use bar the
//! n-parameter) or packed into a `signatureCipher` query string whose `s`
//! field must be descrambled by the player's extracted routine. Both
//! transforms run the extracted JavaScript in an embedded engine; every
//! evaluation gets a fresh single-use runtime so no state leaks between
//! calls.

use crate::error::YtError;
use crate::platform::player::{Player, NSIG_CACHE};
use crate::platform::profiles::{client_profile, profile_for_client_name};
use crate::utils::url::{query_param, set_query_param};
use deno_core::{JsRuntime, RuntimeOptions};
use tracing::debug;
use url::Url;

impl Player {
    /// Resolve a format's URL and/or cipher string into a playable URL.
    ///
    /// Empty sub-programs on a partially-bootstrapped player skip the
    /// corresponding transformation; pre-signed URLs pass through.
    pub async fn decipher(&self, uri: &str, cipher: &str) -> Result<String, YtError> {
        let mut parsed = if uri.is_empty() {
            if cipher.is_empty() || self.sig_source.is_empty() {
                return Err(YtError::Validation(
                    "format carries neither a URL nor a decipherable cipher".into(),
                ));
            }
            self.descramble_cipher(cipher).await?
        } else {
            Url::parse(uri)?
        };

        if let Some(n) = query_param(&parsed, "n") {
            if !self.nsig_source.is_empty() && !self.nsig_check.is_empty() && !n.is_empty() {
                let transformed = self.transform_n(&n).await?;
                set_query_param(&mut parsed, "n", &transformed);
            }
        }

        // Stamp the client version matching the URL's `c` parameter.
        // An unknown client leaves the query untouched.
        if let Some(client_name) = query_param(&parsed, "c") {
            if let Some(profile) = profile_for_client_name(&client_name).and_then(client_profile) {
                set_query_param(&mut parsed, "cver", profile.version);
            }
        }

        Ok(parsed.to_string())
    }

    /// Unpack a `signatureCipher` query string and descramble its `s` field.
    async fn descramble_cipher(&self, cipher: &str) -> Result<Url, YtError> {
        let mut base: Option<String> = None;
        let mut scrambled = String::new();
        let mut sig_param = String::new();

        for (key, value) in url::form_urlencoded::parse(cipher.as_bytes()) {
            match &*key {
                "url" => base = Some(value.into_owned()),
                "s" => scrambled = value.into_owned(),
                "sp" => sig_param = value.into_owned(),
                _ => {}
            }
        }

        let base = base.ok_or_else(|| YtError::Validation("cipher missing url field".into()))?;
        let mut parsed = Url::parse(&base)?;

        let sig_source = self.sig_source.clone();
        let sig = tokio::task::spawn_blocking(move || eval_scrambled_sig(&sig_source, &scrambled))
            .await
            .map_err(|e| YtError::Evaluation(format!("descramble task failed: {e}")))??;

        let param = if sig_param.is_empty() {
            "sig"
        } else {
            sig_param.as_str()
        };
        set_query_param(&mut parsed, param, &sig);

        Ok(parsed)
    }

    /// Transform the throttling n-parameter, memoising per input string.
    async fn transform_n(&self, n: &str) -> Result<String, YtError> {
        if let Some(hit) = NSIG_CACHE.get(n) {
            debug!(n, "nsig cache hit");
            return Ok(hit);
        }

        let source = self.nsig_source.clone();
        let name = self.nsig_name.clone();
        let guard = self.nsig_check.clone();
        let input = n.to_string();

        let transformed = tokio::task::spawn_blocking(move || eval_nsig(&source, &name, &guard, &input))
            .await
            .map_err(|e| YtError::Evaluation(format!("n-param task failed: {e}")))??;

        NSIG_CACHE.insert(n.to_string(), transformed.clone());
        Ok(transformed)
    }
}

fn evaluation_error(err: impl std::fmt::Display) -> YtError {
    YtError::Evaluation(err.to_string())
}

/// Pull the completion value of the last script out of the runtime as a
/// string.
fn global_to_string(
    runtime: &mut JsRuntime,
    value: deno_core::v8::Global<deno_core::v8::Value>,
) -> String {
    let scope = &mut runtime.handle_scope();
    let local = deno_core::v8::Local::new(scope, value);
    local.to_rust_string_lossy(scope)
}

/// Evaluate the descramble program with the global `sig` pre-set.
/// The program's last statement is a call whose result is the value of the
/// whole evaluation.
fn eval_scrambled_sig(sig_source: &str, scrambled: &str) -> Result<String, YtError> {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    let preamble = format!("var sig = {};", serde_json::to_string(scrambled)?);
    runtime
        .execute_script("<sig_env>", preamble)
        .map_err(evaluation_error)?;

    let value = runtime
        .execute_script("<descramble>", sig_source.to_string())
        .map_err(evaluation_error)?;

    Ok(global_to_string(&mut runtime, value))
}

/// Evaluate the n-param program and invoke its named export.
///
/// The guard global is set to true first so the function's
/// `typeof <guard> === "undefined"` early-return does not fire.
fn eval_nsig(source: &str, name: &str, guard: &str, input: &str) -> Result<String, YtError> {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    runtime
        .execute_script("<nsig_guard>", format!("var {guard} = true;"))
        .map_err(evaluation_error)?;

    runtime
        .execute_script("<nsig_src>", source.to_string())
        .map_err(evaluation_error)?;

    let call = format!("{name}({});", serde_json::to_string(input)?);
    let value = runtime
        .execute_script("<nsig_call>", call)
        .map_err(evaluation_error)?;

    Ok(global_to_string(&mut runtime, value))
}
