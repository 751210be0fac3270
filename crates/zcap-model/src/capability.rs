//! Capabilities: the central entity. Two concrete forms, root and
//! delegated, sharing a context descriptor, an identifier, a controller,
//! and an invocation target.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::caveat::Caveat;
use crate::chain::ROOT_ID_PREFIX;
use crate::error::{ErrorCode, ValidationOutcome};
use crate::oneormany::OneOrMany;
use crate::proof::Proof;

/// The single context string every root capability, and the first element
/// of every delegated capability's context array, must carry.
pub const ZCAP_CONTEXT: &str = "https://w3id.org/zcap/v1";

/// Characters NOT percent-encoded when building a root capability id:
/// everything except the unreserved set `[A-Za-z0-9-._~]`.
const UNRESERVED_EXCEPT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode `target` the way a root capability id requires.
pub fn percent_encode_target(target: &str) -> String {
    utf8_percent_encode(target, UNRESERVED_EXCEPT).to_string()
}

/// The deterministic root capability id for a given invocation target.
pub fn root_capability_id(target: &str) -> String {
    format!("{ROOT_ID_PREFIX}{}", percent_encode_target(target))
}

/// A root capability: the identity automatically derived from a target and
/// its controller. No other fields are permitted -- any additional field
/// observed on ingest is a structural error, enforced here via
/// `deny_unknown_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RootCapability {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    pub controller: OneOrMany<String>,
    pub invocation_target: String,
}

impl RootCapability {
    /// Construct a new, structurally valid root capability for `target`.
    pub fn new(target: impl Into<String>, controller: impl Into<OneOrMany<String>>) -> Self {
        let target = target.into();
        Self {
            context: ZCAP_CONTEXT.to_string(),
            id: root_capability_id(&target),
            controller: controller.into(),
            invocation_target: target,
        }
    }

    pub fn validate(&self) -> ValidationOutcome {
        if self.context != ZCAP_CONTEXT {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                "root capability @context must be the single zcap/v1 string",
            )
            .with_context("context", self.context.clone());
        }
        let expected_id = root_capability_id(&self.invocation_target);
        if self.id != expected_id {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                "root capability id does not match percent-encoded invocation target",
            )
            .with_context("expectedId", expected_id)
            .with_context("actualId", self.id.clone());
        }
        ValidationOutcome::success()
    }
}

/// A delegated capability: a narrowed grant of authority issued against a
/// parent (root or itself delegated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedCapability {
    #[serde(rename = "@context")]
    pub context: OneOrMany<String>,
    pub id: String,
    pub controller: OneOrMany<String>,
    pub invocation_target: String,
    pub parent_capability: String,
    pub expires: DateTime<Utc>,
    pub proof: Proof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_action: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveat: Option<Vec<Caveat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoker: Option<String>,
}

impl DelegatedCapability {
    /// Structural invariants that hold regardless of any particular
    /// parent: context shape and strictly-future expiration. Attenuation
    /// against a parent is a separate, pairwise check (`zcap-attenuation`).
    pub fn validate(&self, now: DateTime<Utc>, skew: chrono::Duration) -> ValidationOutcome {
        match self.context.first() {
            Some(first) if first == ZCAP_CONTEXT => {}
            _ => {
                return ValidationOutcome::failure(
                    ErrorCode::MalformedChain,
                    "delegated capability @context must start with the zcap/v1 string",
                )
            }
        }

        if self.expires <= now - skew {
            return ValidationOutcome::failure(ErrorCode::CapabilityExpired, "capability expired")
                .with_context("expires", self.expires.to_rfc3339())
                .with_context("now", now.to_rfc3339());
        }

        ValidationOutcome::success()
    }

    /// The allowed-action set as an ordered vector, or `None` if the
    /// capability carries no action restriction.
    pub fn actions(&self) -> Option<Vec<String>> {
        self.allowed_action
            .as_ref()
            .map(|oom| oom.iter().cloned().collect())
    }

    pub fn caveats(&self) -> &[Caveat] {
        self.caveat.as_deref().unwrap_or(&[])
    }
}

/// Either concrete form of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Capability {
    Root(RootCapability),
    Delegated(DelegatedCapability),
}

impl Capability {
    pub fn id(&self) -> &str {
        match self {
            Capability::Root(r) => &r.id,
            Capability::Delegated(d) => &d.id,
        }
    }

    pub fn invocation_target(&self) -> &str {
        match self {
            Capability::Root(r) => &r.invocation_target,
            Capability::Delegated(d) => &d.invocation_target,
        }
    }

    pub fn controller(&self) -> &OneOrMany<String> {
        match self {
            Capability::Root(r) => &r.controller,
            Capability::Delegated(d) => &d.controller,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Capability::Root(_))
    }

    pub fn as_delegated(&self) -> Option<&DelegatedCapability> {
        match self {
            Capability::Delegated(d) => Some(d),
            Capability::Root(_) => None,
        }
    }

    /// Expiration, treating a root capability as unbounded (`None`).
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        match self {
            Capability::Root(_) => None,
            Capability::Delegated(d) => Some(d.expires),
        }
    }

    pub fn actions(&self) -> Option<Vec<String>> {
        match self {
            Capability::Root(_) => None,
            Capability::Delegated(d) => d.actions(),
        }
    }

    pub fn caveats(&self) -> &[Caveat] {
        match self {
            Capability::Root(_) => &[],
            Capability::Delegated(d) => d.caveats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_capability_id_matches_scenario_one() {
        let root = RootCapability::new("https://api.example.com", "did:example:issuer");
        assert_eq!(
            root.id,
            "urn:zcap:root:https%3A%2F%2Fapi.example.com"
        );
        assert_eq!(root.context, ZCAP_CONTEXT);
        assert!(root.validate().is_valid);
    }

    #[test]
    fn root_context_serializes_as_bare_string() {
        let root = RootCapability::new("https://api.example.com", "did:example:issuer");
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["@context"], ZCAP_CONTEXT);
    }

    #[test]
    fn root_with_extra_field_is_rejected() {
        let json = r#"{
            "@context": "https://w3id.org/zcap/v1",
            "id": "urn:zcap:root:https%3A%2F%2Fx",
            "controller": "did:example:issuer",
            "invocationTarget": "https://x",
            "unexpected": true
        }"#;
        assert!(serde_json::from_str::<RootCapability>(json).is_err());
    }

    #[test]
    fn tampered_root_id_fails_validation() {
        let mut root = RootCapability::new("https://api.example.com", "did:example:issuer");
        root.id = "urn:zcap:root:wrong".to_string();
        let outcome = root.validate();
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some(ErrorCode::MalformedChain));
    }

    #[test]
    fn delegated_capability_rejects_past_expiration() {
        let proof = Proof {
            type_: "Ed25519Signature2020".to_string(),
            created: Utc::now(),
            proof_purpose: crate::proof::ProofPurpose::CapabilityDelegation,
            verification_method: "did:example:issuer#key-1".to_string(),
            proof_value: "zSIG".to_string(),
            capability_chain: None,
            capability: None,
        };
        let child = DelegatedCapability {
            context: OneOrMany::one(ZCAP_CONTEXT.to_string()),
            id: "urn:uuid:child".to_string(),
            controller: OneOrMany::one("did:example:alice".to_string()),
            invocation_target: "https://api.example.com/users".to_string(),
            parent_capability: root_capability_id("https://api.example.com"),
            expires: Utc::now() - chrono::Duration::days(1),
            proof,
            allowed_action: None,
            caveat: None,
            invoker: None,
        };
        let outcome = child.validate(Utc::now(), chrono::Duration::minutes(5));
        assert_eq!(outcome.error_code, Some(ErrorCode::CapabilityExpired));
    }
}
