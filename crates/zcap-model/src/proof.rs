//! The Data Integrity proof attached to a delegated capability or an
//! invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::CapabilityChain;

/// The only signature suite this engine treats as normative.
pub const ED25519_SIGNATURE_2020: &str = "Ed25519Signature2020";

/// Why a proof was produced: delegating authority, or invoking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    CapabilityDelegation,
    CapabilityInvocation,
}

/// An attached Data Integrity proof. `capability_chain` is populated for a
/// delegation proof; `capability` for an invocation proof -- never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub type_: String,
    pub created: DateTime<Utc>,
    pub proof_purpose: ProofPurpose,
    pub verification_method: String,
    pub proof_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_chain: Option<CapabilityChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
}

impl Proof {
    /// Whether `type_` names a suite this engine's signature primitive
    /// actually implements. A mismatch here is a `false` verification
    /// result, never an exception (`spec.md` §4.4).
    pub fn is_supported_suite(&self) -> bool {
        self.type_ == ED25519_SIGNATURE_2020
    }

    /// `created` not more than `skew` in the future relative to `now`.
    /// `spec.md` §3 only bounds the future side of the clock -- a proof
    /// signed arbitrarily long ago is still within skew here; staleness is
    /// governed by the capability's own `expires`, not by `created`.
    pub fn created_within_skew(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        let delta = self.created - now;
        delta <= skew
    }
}
