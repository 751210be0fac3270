//! The two outcome kinds: [`ValidationOutcome`] for the normal (data, not
//! exception) return path of attenuation and chain validation, and
//! [`ZcapFault`] for programmer/infrastructure errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, closed-ish set of validation error codes. `#[non_exhaustive]`
/// because a future caveat or attenuation rule may need a new one without
/// that being a breaking change for callers who only match the codes they
/// care about.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    UrlAttenuationViolation,
    CapabilityExpired,
    ParentCapabilityExpired,
    ExpirationAttenuationViolation,
    ActionAttenuationViolation,
    CaveatInheritanceViolation,
    EmptyChain,
    ChainDepthExceeded,
    PublicKeyNotFound,
    InvalidProofSignature,
    MalformedChain,
    UnknownProofAlgorithm,
    CapabilityRevoked,
    CaveatNotSatisfied,
    InvalidInvocationSignature,
    InvocationCapabilityMismatch,
    InvocationActionNotAllowed,
    InvocationTargetMismatch,
}

impl ErrorCode {
    /// The stable, UPPER_SNAKE wire form used in `spec.md` §4/§8.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UrlAttenuationViolation => "URL_ATTENUATION_VIOLATION",
            ErrorCode::CapabilityExpired => "CAPABILITY_EXPIRED",
            ErrorCode::ParentCapabilityExpired => "PARENT_CAPABILITY_EXPIRED",
            ErrorCode::ExpirationAttenuationViolation => "EXPIRATION_ATTENUATION_VIOLATION",
            ErrorCode::ActionAttenuationViolation => "ACTION_ATTENUATION_VIOLATION",
            ErrorCode::CaveatInheritanceViolation => "CAVEAT_INHERITANCE_VIOLATION",
            ErrorCode::EmptyChain => "EMPTY_CHAIN",
            ErrorCode::ChainDepthExceeded => "CHAIN_DEPTH_EXCEEDED",
            ErrorCode::PublicKeyNotFound => "PUBLIC_KEY_NOT_FOUND",
            ErrorCode::InvalidProofSignature => "INVALID_PROOF_SIGNATURE",
            ErrorCode::MalformedChain => "MALFORMED_CHAIN",
            ErrorCode::UnknownProofAlgorithm => "UNKNOWN_PROOF_ALGORITHM",
            ErrorCode::CapabilityRevoked => "CAPABILITY_REVOKED",
            ErrorCode::CaveatNotSatisfied => "CAVEAT_NOT_SATISFIED",
            ErrorCode::InvalidInvocationSignature => "INVALID_INVOCATION_SIGNATURE",
            ErrorCode::InvocationCapabilityMismatch => "INVOCATION_CAPABILITY_MISMATCH",
            ErrorCode::InvocationActionNotAllowed => "INVOCATION_ACTION_NOT_ALLOWED",
            ErrorCode::InvocationTargetMismatch => "INVOCATION_TARGET_MISMATCH",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Offending-value context attached to a failed [`ValidationOutcome`]:
/// URLs, actions, expirations, chain indices, whatever the failing check
/// wants to report. Kept as an ordered string map rather than a fixed
/// struct since each error code populates a different subset of keys.
pub type ValidationContext = BTreeMap<String, String>;

/// The result of an attenuation or chain validation check. Not an error
/// type -- failures are data, never exceptions, per the validation/fault
/// split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub error_code: Option<ErrorCode>,
    pub message: String,
    pub context: ValidationContext,
}

impl ValidationOutcome {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            error_code: None,
            message: String::new(),
            context: ValidationContext::new(),
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_code: Some(code),
            message: message.into(),
            context: ValidationContext::new(),
        }
    }

    /// Attach a context key/value, builder style.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Exceptional faults: programmer errors, infrastructure failures,
/// malformed input at the structural layer. Never returned for a failed
/// attenuation or chain check -- those are [`ValidationOutcome`].
#[derive(Debug, Error)]
pub enum ZcapFault {
    #[error("structural error: {0}")]
    Structural(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ZcapFault>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_code() {
        let outcome = ValidationOutcome::success();
        assert!(outcome.is_valid);
        assert!(outcome.error_code.is_none());
    }

    #[test]
    fn failure_carries_context() {
        let outcome = ValidationOutcome::failure(ErrorCode::UrlAttenuationViolation, "bad suffix")
            .with_context("parent", "https://x/api")
            .with_context("child", "https://x/api-v2");
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some(ErrorCode::UrlAttenuationViolation));
        assert_eq!(outcome.context.get("child").unwrap(), "https://x/api-v2");
    }

    #[test]
    fn error_code_wire_form() {
        assert_eq!(
            ErrorCode::ChainDepthExceeded.as_str(),
            "CHAIN_DEPTH_EXCEEDED"
        );
    }
}
