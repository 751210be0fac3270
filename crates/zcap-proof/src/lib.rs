//! The Data Integrity proof pipeline: canonicalize → sign → multibase
//! encode, and the inverse for verification (`spec.md` §4.4).
//!
//! Operates over `serde_json::Value` rather than the typed `Capability`/
//! `Invocation` structs directly, because the pipeline's first step is
//! "drop the proof field" -- a transform that is natural on the untyped
//! document and awkward to express on a struct whose `proof` field isn't
//! optional. Callers serialize their document, strip `proof`, and get
//! back a [`zcap_model::Proof`] to attach; verification takes the same
//! proof-stripped document plus the attached proof.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use zcap_model::{CapabilityChain, ErrorCode, Proof, ProofPurpose, Result, ValidationOutcome, ZcapFault};

/// What a proof attests to: a delegation carries the full capability
/// chain, an invocation carries just the capability id being invoked.
#[derive(Debug, Clone)]
pub enum ProofSubject {
    Delegation(CapabilityChain),
    Invocation(String),
}

/// Serialize `doc` and remove its `proof` field, producing the document
/// the canonicalizer actually signs. A document with no `proof` field
/// yet (a fresh draft) round-trips unchanged.
pub fn strip_proof(doc: &impl Serialize) -> Result<Value> {
    let mut value = serde_json::to_value(doc)
        .map_err(|e| ZcapFault::Serialization(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("proof");
    }
    Ok(value)
}

/// Build a Data Integrity proof over `document_without_proof`.
///
/// Steps (`spec.md` §4.4 Build): canonicalize the document, sign the
/// canonical bytes, multibase-encode the signature, and emit a proof
/// carrying the capability chain (delegation) or the invoked capability id
/// (invocation).
pub fn build(
    document_without_proof: &Value,
    purpose: ProofPurpose,
    verification_method: impl Into<String>,
    signing_key: &zcap_crypto::PrivateKey,
    subject: ProofSubject,
    now: DateTime<Utc>,
) -> Result<Proof> {
    let verification_method = verification_method.into();
    if !zcap_model::is_absolute_uri(&verification_method) {
        return Err(ZcapFault::Structural(format!(
            "verificationMethod is not an absolute URI: {verification_method}"
        )));
    }

    let bytes = zcap_canon::canonicalize(document_without_proof)
        .map_err(|e| ZcapFault::Canonicalization(e.to_string()))?;
    let signature = zcap_crypto::sign(&bytes, signing_key);
    let proof_value = zcap_multibase::encode(&signature, zcap_multibase::Scheme::Base58Btc);

    let (capability_chain, capability) = match subject {
        ProofSubject::Delegation(chain) => (Some(chain), None),
        ProofSubject::Invocation(capability_id) => (None, Some(capability_id)),
    };

    tracing::debug!(purpose = ?purpose, verification_method = %verification_method, "proof built");

    Ok(Proof {
        type_: zcap_model::ED25519_SIGNATURE_2020.to_string(),
        created: now,
        proof_purpose: purpose,
        verification_method,
        proof_value,
        capability_chain,
        capability,
    })
}

/// Structural shape checks on a proof that don't require the public key:
/// known purpose (the Rust enum already closes this), a well-formed
/// `verificationMethod`, and `created` within clock skew of `now`.
fn structural_ok(proof: &Proof, now: DateTime<Utc>, skew: chrono::Duration) -> ValidationOutcome {
    if !zcap_model::is_absolute_uri(&proof.verification_method) {
        return ValidationOutcome::failure(
            ErrorCode::MalformedChain,
            "proof verificationMethod is not an absolute URI",
        )
        .with_context("verificationMethod", proof.verification_method.clone());
    }
    if !proof.created_within_skew(now, skew) {
        return ValidationOutcome::failure(
            ErrorCode::MalformedChain,
            "proof created timestamp is outside the allowed clock skew",
        )
        .with_context("created", proof.created.to_rfc3339())
        .with_context("now", now.to_rfc3339());
    }
    ValidationOutcome::success()
}

/// Verify `proof`, attached to `document_without_proof`, under `public_key`.
///
/// Returns `Ok(false)` for any tampering, structural defect, or algorithm
/// mismatch -- those are ordinary verification failures, not exceptions.
/// Returns `Err` only for an infrastructure fault (canonicalization
/// failure, a structurally impossible public key): `spec.md` §4.4 requires
/// callers be able to distinguish "forged" from "broken".
pub fn verify(
    document_without_proof: &Value,
    proof: &Proof,
    public_key: &zcap_crypto::PublicKey,
    now: DateTime<Utc>,
    skew: chrono::Duration,
) -> Result<bool> {
    if !proof.is_supported_suite() {
        tracing::debug!(suite = %proof.type_, "proof verification rejected: unsupported suite");
        return Ok(false);
    }

    if !structural_ok(proof, now, skew).is_valid {
        tracing::debug!("proof verification rejected: structural check failed");
        return Ok(false);
    }

    let bytes = zcap_canon::canonicalize(document_without_proof)
        .map_err(|e| ZcapFault::Canonicalization(e.to_string()))?;

    let signature = match zcap_multibase::decode(&proof.proof_value) {
        Ok(sig) => sig,
        Err(_) => {
            tracing::debug!("proof verification rejected: proofValue did not decode");
            return Ok(false);
        }
    };

    zcap_crypto::verify(&bytes, &signature, public_key)
        .map_err(|e| ZcapFault::Crypto(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "@context": "https://w3id.org/zcap/v1",
            "id": "urn:zcap:root:https%3A%2F%2Fapi.example.com",
            "controller": "did:example:issuer",
            "invocationTarget": "https://api.example.com"
        })
    }

    #[test]
    fn build_then_verify_round_trips() {
        let kp = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let now = Utc::now();
        let proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation(unsigned["id"].as_str().unwrap().to_string()),
            now,
        )
        .unwrap();

        assert!(verify(&unsigned, &proof, &kp.public, now, chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn tampered_document_fails_verification() {
        let kp = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let now = Utc::now();
        let proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation("urn:zcap:root:https%3A%2F%2Fapi.example.com".to_string()),
            now,
        )
        .unwrap();

        let mut tampered = unsigned.clone();
        tampered["controller"] = json!("did:example:mallory");
        assert!(!verify(&tampered, &proof, &kp.public, now, chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp = zcap_crypto::KeyPair::generate();
        let other = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let now = Utc::now();
        let proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation("urn:zcap:root:https%3A%2F%2Fapi.example.com".to_string()),
            now,
        )
        .unwrap();

        assert!(!verify(&unsigned, &proof, &other.public, now, chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn unsupported_suite_yields_false_not_error() {
        let kp = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let now = Utc::now();
        let mut proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation("urn:zcap:root:https%3A%2F%2Fapi.example.com".to_string()),
            now,
        )
        .unwrap();
        proof.type_ = "RsaSignature2018".to_string();

        assert!(!verify(&unsigned, &proof, &kp.public, now, chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn created_long_in_the_past_still_verifies() {
        // Only the future side of the clock is bounded (`spec.md` §3): a
        // capability is routinely verified long after it was signed, well
        // within its much longer `expires` window, so a proof created an
        // hour ago must still verify against a skew of minutes.
        let kp = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let creation_time = Utc::now() - chrono::Duration::hours(1);
        let proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation("urn:zcap:root:https%3A%2F%2Fapi.example.com".to_string()),
            creation_time,
        )
        .unwrap();

        assert!(verify(&unsigned, &proof, &kp.public, Utc::now(), chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn created_too_far_in_the_future_fails() {
        let kp = zcap_crypto::KeyPair::generate();
        let unsigned = doc();
        let creation_time = Utc::now() + chrono::Duration::hours(1);
        let proof = build(
            &unsigned,
            ProofPurpose::CapabilityInvocation,
            "did:example:issuer#key-1",
            &kp.private,
            ProofSubject::Invocation("urn:zcap:root:https%3A%2F%2Fapi.example.com".to_string()),
            creation_time,
        )
        .unwrap();

        assert!(!verify(&unsigned, &proof, &kp.public, Utc::now(), chrono::Duration::minutes(5)).unwrap());
    }

    #[test]
    fn strip_proof_removes_existing_proof_field() {
        let with_proof = json!({
            "id": "urn:uuid:child",
            "proof": { "type": "Ed25519Signature2020" }
        });
        let stripped = strip_proof(&with_proof).unwrap();
        assert!(stripped.get("proof").is_none());
        assert_eq!(stripped["id"], "urn:uuid:child");
    }
}
