//! Data URL encoding of chunk bytes.
//!
//! Chunks are sliced without a content type, so the URL always declares
//! `application/octet-stream`, whatever the type of the whole file.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a base64 data URL")]
    NotDataUrl,
    #[error("Base64 decode error: {0:?}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Empty input encodes to the bare `data:` URL.
pub fn to_data_url(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "data:".to_owned();
    }
    let mut result = String::with_capacity(DATA_URL_PREFIX.len() + bytes.len().div_ceil(3) * 4);
    result.push_str(DATA_URL_PREFIX);
    BASE64.encode_string(bytes, &mut result);
    result
}

/// Decodes any `data:<mime>;base64,<payload>` URL.
pub fn from_data_url(url: &str) -> Result<Vec<u8>, Error> {
    let rest = url.strip_prefix("data:").ok_or(Error::NotDataUrl)?;
    if rest.is_empty() {
        return Ok(vec![]);
    }
    let (_, payload) = rest.split_once(";base64,").ok_or(Error::NotDataUrl)?;
    Ok(BASE64.decode(payload)?)
}
