//! URL helpers around player scripts and stream URLs

use crate::error::CipherError;
use crate::platform::cipher::Cipher;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// Parameter name used when a `signatureCipher` carries no `sp`
const DEFAULT_SIGNATURE_PARAM: &str = "signature";

/// Extract the player version from a script URL such as
/// `/s/player/6d1c2f5a/player_ias.vflset/en_US/base.js`
pub fn extract_player_id(player_url: &str) -> Result<String> {
    player_id_regex()?
        .captures(player_url)
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str().to_string())
        .ok_or(CipherError::NoPatternMatched("player id"))
}

fn player_id_regex() -> Result<&'static Regex> {
    static PLAYER_ID: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PLAYER_ID.get() {
        return Ok(re);
    }
    let re = Regex::new(r"/s/player/(?P<id>[0-9a-fA-F]{8})/")?;
    Ok(PLAYER_ID.get_or_init(|| re))
}

/// Turn a form-encoded `signatureCipher` value into a playable URL.
///
/// `s` is deciphered and stored under the `sp` parameter name on `url`.
pub fn resolve_signature_cipher(signature_cipher: &str, cipher: &Cipher) -> Result<String> {
    let params: HashMap<String, String> = url::form_urlencoded::parse(signature_cipher.as_bytes())
        .into_owned()
        .collect();

    let base = params
        .get("url")
        .ok_or_else(|| CipherError::MalformedInput("signatureCipher without url".to_string()))?;
    let signature = params
        .get("s")
        .ok_or_else(|| CipherError::MalformedInput("signatureCipher without s".to_string()))?;
    let sp = params
        .get("sp")
        .map(String::as_str)
        .unwrap_or(DEFAULT_SIGNATURE_PARAM);

    let deciphered = cipher.decipher_signature(signature)?;
    debug!("Resolved signature into '{}' parameter", sp);
    Ok(set_query_param(Url::parse(base)?, sp, &deciphered).into())
}

/// Replace the `n` query parameter of `url` with its transformed value.
/// URLs without `n` are returned unchanged.
pub fn rewrite_throttling_param(url: &str, cipher: &Cipher) -> Result<String> {
    let parsed = Url::parse(url)?;
    let n = match parsed.query_pairs().find(|(k, _)| k == "n") {
        Some((_, v)) => v.into_owned(),
        None => return Ok(url.to_string()),
    };

    let transformed = cipher.decipher_throttling(&n)?;
    debug!("Rewrote n parameter ({} -> {} chars)", n.len(), transformed.len());
    Ok(set_query_param(parsed, "n", &transformed).into())
}

/// Set `key` to `value`, keeping the position of an existing pair and the
/// order of all others
fn set_query_param(mut url: Url, key: &str, value: &str) -> Url {
    // Collect pairs first (immutable borrow), then rebuild (mutable borrow)
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    url
}
