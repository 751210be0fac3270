//! Self-describing multibase encoding.
//!
//! A multibase string is a single prefix character identifying the base,
//! followed by the encoded payload. This crate implements the four
//! encodings ZCAP-LD proof values are allowed to use: Base58-BTC (`z`,
//! the normative default for `proofValue`), Base64-URL (`u`), Base64
//! (`m`), and Base32 (`b`).
//!
//! Stateless and thread-safe: every function is a pure transform over its
//! arguments.

use base64::Engine;
use thiserror::Error;

/// A supported multibase encoding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Base58-BTC, prefix `z`. Normative default for ZCAP-LD proof values.
    Base58Btc,
    /// Base64-URL (unpadded), prefix `u`.
    Base64Url,
    /// Base64 (unpadded), prefix `m`.
    Base64,
    /// Base32 (RFC4648, unpadded, lowercase), prefix `b`.
    Base32,
}

impl Scheme {
    fn prefix(self) -> char {
        match self {
            Scheme::Base58Btc => 'z',
            Scheme::Base64Url => 'u',
            Scheme::Base64 => 'm',
            Scheme::Base32 => 'b',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'z' => Some(Scheme::Base58Btc),
            'u' => Some(Scheme::Base64Url),
            'm' => Some(Scheme::Base64),
            'b' => Some(Scheme::Base32),
            _ => None,
        }
    }
}

/// Multibase codec errors.
#[derive(Debug, Error)]
pub enum MultibaseError {
    /// Input to `decode` was empty.
    #[error("cannot decode an empty multibase string")]
    EmptyInput,

    /// The leading character did not match any known scheme.
    #[error("unknown multibase scheme prefix: {0:?}")]
    UnknownScheme(char),

    /// The payload was not valid for the scheme its prefix claimed.
    #[error("invalid {scheme} payload: {detail}")]
    InvalidPayload { scheme: &'static str, detail: String },
}

/// Encode `bytes` using the given multibase `scheme`, returning the
/// prefixed string.
pub fn encode(bytes: &[u8], scheme: Scheme) -> String {
    let body = match scheme {
        Scheme::Base58Btc => bs58::encode(bytes).into_string(),
        Scheme::Base64Url => base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
        Scheme::Base64 => base64::engine::general_purpose::STANDARD_NO_PAD.encode(bytes),
        Scheme::Base32 => data_encoding::BASE32_NOPAD.encode(bytes).to_lowercase(),
    };
    format!("{}{}", scheme.prefix(), body)
}

/// Decode a multibase string, dispatching on its leading character.
pub fn decode(s: &str) -> Result<Vec<u8>, MultibaseError> {
    let mut chars = s.chars();
    let prefix = chars.next().ok_or(MultibaseError::EmptyInput)?;
    let scheme = Scheme::from_prefix(prefix).ok_or(MultibaseError::UnknownScheme(prefix))?;
    let body = chars.as_str();

    match scheme {
        Scheme::Base58Btc => bs58::decode(body).into_vec().map_err(|e| MultibaseError::InvalidPayload {
            scheme: "base58-btc",
            detail: e.to_string(),
        }),
        Scheme::Base64Url => base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| MultibaseError::InvalidPayload {
                scheme: "base64url",
                detail: e.to_string(),
            }),
        Scheme::Base64 => base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(body)
            .map_err(|e| MultibaseError::InvalidPayload {
                scheme: "base64",
                detail: e.to_string(),
            }),
        Scheme::Base32 => data_encoding::BASE32_NOPAD
            .decode(body.to_uppercase().as_bytes())
            .map_err(|e| MultibaseError::InvalidPayload {
                scheme: "base32",
                detail: e.to_string(),
            }),
    }
}
