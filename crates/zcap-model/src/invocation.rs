//! Invocations: the act of exercising a capability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::proof::Proof;

/// A typed argument value passed alongside an invocation. JSON-shaped,
/// since the wire format is JSON-LD and arguments have no fixed schema.
pub type InvocationArguments = BTreeMap<String, serde_json::Value>;

/// The act of exercising a capability: a signed intent to perform
/// `action` against `target` under the authority of `capability`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub id: String,
    pub capability: String,
    pub action: String,
    pub invocation_target: String,
    pub invoker: String,
    pub proof: Proof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<InvocationArguments>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ProofPurpose;
    use chrono::Utc;

    #[test]
    fn invocation_round_trips() {
        let invocation = Invocation {
            id: "urn:uuid:inv-1".to_string(),
            capability: "urn:uuid:cap-1".to_string(),
            action: "read".to_string(),
            invocation_target: "https://api.example.com/users/123".to_string(),
            invoker: "did:example:bob".to_string(),
            proof: Proof {
                type_: "Ed25519Signature2020".to_string(),
                created: Utc::now(),
                proof_purpose: ProofPurpose::CapabilityInvocation,
                verification_method: "did:example:bob#key-1".to_string(),
                proof_value: "zSIG".to_string(),
                capability_chain: None,
                capability: Some("urn:uuid:cap-1".to_string()),
            },
            arguments: None,
        };

        let json = serde_json::to_string(&invocation).unwrap();
        let back: Invocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, invocation);
        assert!(!json.contains("arguments"));
    }
}
