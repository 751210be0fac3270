//! Errors from the delegation and invocation services.

use thiserror::Error;
use zcap_model::{ValidationOutcome, ZcapFault};

/// Either flavor of failure a service call can report: a rejected
/// attenuation/validation check (data, carries its [`ValidationOutcome`])
/// or an infrastructure fault while building the result (propagated from
/// `zcap-proof`/`zcap-canon`/`zcap-crypto`). Kept distinct from
/// `zcap_model::ZcapFault` alone because a rejected delegation is the
/// expected, common outcome of this service, not an exceptional one.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("rejected: {} ({})", .0.message, .0.error_code.map(|c| c.as_str()).unwrap_or("?"))]
    Rejected(ValidationOutcome),

    #[error(transparent)]
    Fault(#[from] ZcapFault),
}

impl From<ValidationOutcome> for ServiceError {
    fn from(outcome: ValidationOutcome) -> Self {
        ServiceError::Rejected(outcome)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
