//! Errors from JSON-LD expansion and RDFC-1.0 canonicalization.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("could not resolve JSON-LD context: {0}")]
    ContextResolutionFailed(String),

    #[error("invalid JSON-LD document: {0}")]
    InvalidJsonLd(String),

    #[error("RDFC-1.0 canonicalization failed: {0}")]
    CanonicalizationFailed(String),

    #[error("canonicalization cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CanonError>;
