//! The invocation service (`spec.md` §4.8): construct an invocation
//! against a capability, and later validate it -- capability match,
//! action, target, and the capability's own chain of authority.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use zcap_model::{
    Capability, CapabilityChain, EngineConfig, ErrorCode, Invocation, InvocationArguments,
    Proof, ProofPurpose, ValidationOutcome,
};

use crate::error::{Result, ServiceError};

/// What the caller supplies to invoke a capability.
#[derive(Debug, Clone, Default)]
pub struct InvocationRequest {
    pub invocation_target: Option<String>,
    pub arguments: Option<InvocationArguments>,
}

/// Construct an invocation of `capability`. Construction mirrors
/// delegation (§4.7) but carries `CapabilityInvocation` purpose and
/// references the capability by id rather than embedding a chain.
pub fn invoke(
    capability: &Capability,
    invoker: impl Into<String>,
    action: impl Into<String>,
    request: InvocationRequest,
    signing_key: &zcap_crypto::PrivateKey,
    verification_method: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<Invocation> {
    let verification_method = verification_method.into();
    let draft = Invocation {
        id: format!("urn:uuid:{}", Uuid::new_v4()),
        capability: capability.id().to_string(),
        action: action.into(),
        invocation_target: request
            .invocation_target
            .unwrap_or_else(|| capability.invocation_target().to_string()),
        invoker: invoker.into(),
        proof: Proof {
            type_: zcap_model::ED25519_SIGNATURE_2020.to_string(),
            created: now,
            proof_purpose: ProofPurpose::CapabilityInvocation,
            verification_method: verification_method.clone(),
            proof_value: String::new(),
            capability_chain: None,
            capability: None,
        },
        arguments: request.arguments,
    };

    let stripped = zcap_proof::strip_proof(&draft)?;
    let proof = zcap_proof::build(
        &stripped,
        ProofPurpose::CapabilityInvocation,
        verification_method,
        signing_key,
        zcap_proof::ProofSubject::Invocation(capability.id().to_string()),
        now,
    )?;

    let invocation = Invocation { proof, ..draft };
    tracing::info!(id = %invocation.id, capability = %invocation.capability, "capability invoked");
    Ok(invocation)
}

fn check_capability_match(invocation: &Invocation, capability: &Capability) -> ValidationOutcome {
    if invocation.capability == capability.id() {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::InvocationCapabilityMismatch,
            "invocation's capability field does not match the capability being invoked",
        )
        .with_context("invocationCapability", invocation.capability.clone())
        .with_context("capabilityId", capability.id().to_string())
    }
}

fn check_action_allowed(invocation: &Invocation, capability: &Capability) -> ValidationOutcome {
    let Some(allowed) = capability.actions() else {
        return ValidationOutcome::success();
    };
    let requested = invocation.action.to_lowercase();
    if allowed.iter().any(|a| a.to_lowercase() == requested) {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::InvocationActionNotAllowed,
            "invoked action is not in the capability's allowed action set",
        )
        .with_context("action", invocation.action.clone())
        .with_context("allowedActions", allowed.join(","))
    }
}

fn check_target_suffix(invocation: &Invocation, capability: &Capability) -> ValidationOutcome {
    if zcap_attenuation::url_attenuation_ok(capability.invocation_target(), &invocation.invocation_target) {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::InvocationTargetMismatch,
            "invocation target is not equal to or a path suffix of the capability's target",
        )
        .with_context("capabilityTarget", capability.invocation_target().to_string())
        .with_context("invocationTarget", invocation.invocation_target.clone())
    }
}

fn check_invocation_proof<R: zcap_chain::PublicKeyLookup>(
    invocation: &Invocation,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<ValidationOutcome> {
    if !config.validate_proof_signatures {
        return Ok(ValidationOutcome::success());
    }

    let Some(pk_bytes) = resolver.lookup(&invocation.proof.verification_method) else {
        return Ok(ValidationOutcome::failure(
            ErrorCode::PublicKeyNotFound,
            "could not resolve invocation proof verificationMethod to a public key",
        )
        .with_context("verificationMethod", invocation.proof.verification_method.clone()));
    };
    let public_key = match zcap_crypto::PublicKey::from_bytes(&pk_bytes) {
        Ok(pk) => pk,
        Err(_) => {
            return Ok(ValidationOutcome::failure(
                ErrorCode::PublicKeyNotFound,
                "resolved public key is structurally invalid",
            ))
        }
    };

    let stripped = zcap_proof::strip_proof(invocation)?;
    let skew = chrono::Duration::from_std(config.max_clock_skew).unwrap_or(chrono::Duration::zero());
    let verified = zcap_proof::verify(&stripped, &invocation.proof, &public_key, now, skew)?;
    if verified {
        Ok(ValidationOutcome::success())
    } else {
        Ok(ValidationOutcome::failure(
            ErrorCode::InvalidInvocationSignature,
            "invocation proof did not verify against the resolved public key",
        ))
    }
}

/// Validate `invocation` against `capability` and its presented `chain`.
/// Checks, in order: the invocation's own proof signature, the capability
/// field match, the action restriction, the target suffix rule, and
/// finally that `capability` itself validates under §4.6.
pub fn validate_invocation<R: zcap_chain::PublicKeyLookup>(
    invocation: &Invocation,
    capability: &Capability,
    chain: &CapabilityChain,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<ValidationOutcome> {
    let proof_outcome = check_invocation_proof(invocation, resolver, config, now)?;
    if !proof_outcome.is_valid {
        return Ok(proof_outcome);
    }

    let capability_match = check_capability_match(invocation, capability);
    if !capability_match.is_valid {
        return Ok(capability_match);
    }

    let action_outcome = check_action_allowed(invocation, capability);
    if !action_outcome.is_valid {
        return Ok(action_outcome);
    }

    let target_outcome = check_target_suffix(invocation, capability);
    if !target_outcome.is_valid {
        return Ok(target_outcome);
    }

    Ok(zcap_chain::validate(capability, chain, resolver, config, now))
}

/// Convenience wrapper returning [`ServiceError::Rejected`] on any
/// validation failure, for callers that want `?` instead of inspecting
/// the returned [`ValidationOutcome`] themselves.
pub fn validate_invocation_strict<R: zcap_chain::PublicKeyLookup>(
    invocation: &Invocation,
    capability: &Capability,
    chain: &CapabilityChain,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    let outcome = validate_invocation(invocation, capability, chain, resolver, config, now)?;
    if outcome.is_valid {
        Ok(())
    } else {
        Err(ServiceError::from(outcome))
    }
}
