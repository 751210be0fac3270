//! The delegation service (`spec.md` §4.7): construct a delegated
//! capability from a parent, a delegatee, a signing key, and optional
//! attenuations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use zcap_model::{
    Capability, CapabilityChain, Caveat, ChainElement, DelegatedCapability, EngineConfig,
    OneOrMany, Proof, ProofPurpose, ZCAP_CONTEXT,
};

use crate::error::{Result, ServiceError};

/// What the caller supplies beyond `(parent, delegatee)`: everything a
/// delegation can narrow. `None` on `invocation_target`/`expires` means
/// "inherit the parent's target" / "use the engine's default duration".
#[derive(Debug, Clone, Default)]
pub struct DelegationRequest {
    pub invocation_target: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub allowed_action: Option<Vec<String>>,
    pub caveat: Option<Vec<Caveat>>,
    pub invoker: Option<String>,
}

/// A freshly delegated capability together with the chain a future
/// holder must present alongside it to prove its authority.
#[derive(Debug, Clone)]
pub struct Delegation {
    pub capability: DelegatedCapability,
    pub chain: CapabilityChain,
}

/// The ancestor-id prefix of `parent`'s own chain, with any embedded
/// grandparent dropped and `parent`'s own id appended -- the lineage a
/// new child's chain is built on top of by appending `Embedded(parent)`.
///
/// Grounded on `zcap_chain`'s `parent_own_chain`: a delegated parent's
/// authoritative lineage is the `capabilityChain` recorded on its own
/// proof, not anything the caller has to pass in separately.
fn ancestor_ids(parent: &Capability) -> Result<Vec<ChainElement>> {
    match parent {
        Capability::Root(root) => Ok(vec![ChainElement::Id(root.id.clone())]),
        Capability::Delegated(delegated) => {
            let mut ids = delegated.proof.capability_chain.clone().ok_or_else(|| {
                ServiceError::from(zcap_model::ValidationOutcome::failure(
                    zcap_model::ErrorCode::MalformedChain,
                    "parent capability is missing its own capabilityChain",
                ))
            })?;
            ids.pop();
            ids.push(ChainElement::Id(delegated.id.clone()));
            Ok(ids)
        }
    }
}

/// Construct a delegated capability. Aborts with [`ServiceError::Rejected`]
/// before any signature is ever computed if the draft fails attenuation
/// against `parent` -- a capability that would violate its parent's
/// constraints is never signed, let alone returned.
pub fn delegate(
    parent: &Capability,
    delegatee_controller: impl Into<String>,
    request: DelegationRequest,
    signing_key: &zcap_crypto::PrivateKey,
    verification_method: impl Into<String>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Delegation> {
    let verification_method = verification_method.into();
    let expires = match request.expires {
        Some(e) => e,
        None => {
            now + chrono::Duration::from_std(config.default_expiration_duration)
                .unwrap_or_else(|_| chrono::Duration::seconds(60))
        }
    };

    let draft = DelegatedCapability {
        context: OneOrMany::one(ZCAP_CONTEXT.to_string()),
        id: format!("urn:uuid:{}", Uuid::new_v4()),
        controller: OneOrMany::one(delegatee_controller.into()),
        invocation_target: request
            .invocation_target
            .unwrap_or_else(|| parent.invocation_target().to_string()),
        parent_capability: parent.id().to_string(),
        expires,
        proof: Proof {
            type_: zcap_model::ED25519_SIGNATURE_2020.to_string(),
            created: now,
            proof_purpose: ProofPurpose::CapabilityDelegation,
            verification_method: verification_method.clone(),
            proof_value: String::new(),
            capability_chain: None,
            capability: None,
        },
        allowed_action: request
            .allowed_action
            .map(|actions| OneOrMany::Many(actions)),
        caveat: request.caveat,
        invoker: request.invoker,
    };

    let attenuation = zcap_attenuation::validate(parent, &draft, config, now);
    if !attenuation.is_valid {
        tracing::debug!(
            code = %attenuation.error_code.unwrap(),
            "delegation rejected: attenuation check failed"
        );
        return Err(attenuation.into());
    }

    let mut chain = ancestor_ids(parent)?;
    chain.push(ChainElement::Embedded(Box::new(parent.clone())));

    let stripped = zcap_proof::strip_proof(&draft)?;
    let proof = zcap_proof::build(
        &stripped,
        ProofPurpose::CapabilityDelegation,
        verification_method,
        signing_key,
        zcap_proof::ProofSubject::Delegation(chain.clone()),
        now,
    )?;

    let capability = DelegatedCapability { proof, ..draft };
    tracing::info!(id = %capability.id, parent = %capability.parent_capability, "capability delegated");
    Ok(Delegation { capability, chain })
}
