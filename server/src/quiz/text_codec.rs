//! Reversible text <-> token transform used for every free-text field and for
//! the whole payload.
//!
//! Tokens are the UTF-8 bytes of the text in URL-safe base64 without padding,
//! so they can sit in a query value without percent-encoding. Decoding also
//! accepts the standard alphabet, with or without padding, which is what links
//! generated by the earlier browser build contain.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::error::TextCodecError;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn encode_text(text: &str) -> String {
    TOKEN_ENGINE.encode(text.as_bytes())
}

/// Like [`decode_text`] but reports why a token was rejected.
pub fn try_decode_text(token: &str) -> Result<String, TextCodecError> {
    // Spaces are kept: a trailing one may be a '+' that lost its escaping.
    let token = token.trim_matches(|c| c == '\n' || c == '\r' || c == '\t');
    let bytes = match TOKEN_ENGINE.decode(token) {
        Ok(bytes) => bytes,
        // A '+' from the standard alphabet turns into a space when the token
        // went through form-urlencoded parsing unescaped.
        Err(_) => STANDARD_ENGINE.decode(token.replace(' ', "+"))?,
    };
    Ok(String::from_utf8(bytes)?)
}

/// Decodes a token; malformed input yields an empty string.
pub fn decode_text(token: &str) -> String {
    match try_decode_text(token) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, token.length = token.len(), "Discarding undecodable text token");
            String::new()
        }
    }
}
