//! The delegation-chain validator: decides whether a leaf capability
//! together with a presented chain is a valid proof of authority.
//!
//! Walks leaf toward root through a fixed phase ordering -- structure,
//! depth, continuity, proof, attenuation, recurse -- per `spec.md` §4.6.
//! The first failure along that ordering determines the reported error
//! code; phases never run out of order or speculatively in parallel,
//! because that ordering is itself part of the contract callers rely on
//! for attributing blame.

use chrono::{DateTime, Utc};

use zcap_model::{
    Capability, CapabilityChain, ChainElement, DelegatedCapability, EngineConfig, ErrorCode,
    ValidationOutcome, ZcapFault,
};

/// Resolves a `verificationMethod` URI to the 32-byte Ed25519 public key it
/// identifies. Implemented synchronously because chain validation is a
/// pure, blocking call (`spec.md` §5) -- hosts whose key resolution is
/// naturally async (a DID resolver, an HSM) block on it here and do their
/// own scheduling around that, the same way `zcap-proof`/`zcap-canon`
/// expose blocking calls for CPU-bound work.
pub trait PublicKeyLookup {
    fn lookup(&self, verification_method: &str) -> Option<[u8; 32]>;
}

/// A resolver that never finds a key -- useful for exercising the
/// structural/depth/continuity phases in isolation.
pub struct NoKeysFound;

impl PublicKeyLookup for NoKeysFound {
    fn lookup(&self, _verification_method: &str) -> Option<[u8; 32]> {
        None
    }
}

fn embedded_parent(chain: &CapabilityChain) -> Option<&Capability> {
    chain.last().and_then(ChainElement::as_embedded)
}

/// Phase 1: non-empty, root-prefixed first element, no repeated ids
/// (already `zcap_model::chain::validate_structure`), every element
/// strictly between the first and the embedded parent is a bare id, and
/// -- only when the leaf is delegated -- the last element is the
/// embedded parent capability.
fn check_structure(leaf: &Capability, chain: &CapabilityChain) -> ValidationOutcome {
    let base = zcap_model::chain::validate_structure(chain);
    if !base.is_valid {
        return base;
    }

    if leaf.is_root() {
        return ValidationOutcome::success();
    }

    let Some(last) = chain.last() else {
        return ValidationOutcome::failure(ErrorCode::EmptyChain, "capability chain is empty");
    };
    if last.as_embedded().is_none() {
        return ValidationOutcome::failure(
            ErrorCode::MalformedChain,
            "a delegated leaf's chain must embed its parent capability as the last element",
        );
    }

    let intermediate_end = chain.len() - 1;
    for element in &chain[1..intermediate_end] {
        if element.as_embedded().is_some() {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                "only the final chain element may embed a capability",
            );
        }
    }

    ValidationOutcome::success()
}

fn check_continuity(leaf: &Capability, chain: &CapabilityChain) -> ValidationOutcome {
    match leaf {
        Capability::Root(root) => {
            if chain.len() == 1 && chain[0].id() == root.id {
                ValidationOutcome::success()
            } else {
                ValidationOutcome::failure(
                    ErrorCode::MalformedChain,
                    "a root leaf's chain must contain exactly its own id",
                )
            }
        }
        Capability::Delegated(delegated) => {
            let parent = embedded_parent(chain).expect("checked by check_structure");
            if delegated.parent_capability == parent.id() {
                ValidationOutcome::success()
            } else {
                ValidationOutcome::failure(
                    ErrorCode::MalformedChain,
                    "leaf's parentCapability does not match the embedded parent's id",
                )
                .with_context("parentCapability", delegated.parent_capability.clone())
                .with_context("embeddedParentId", parent.id().to_string())
            }
        }
    }
}

fn check_proof<R: PublicKeyLookup>(
    delegated: &DelegatedCapability,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    if !config.validate_proof_signatures {
        return ValidationOutcome::success();
    }

    let Some(pk_bytes) = resolver.lookup(&delegated.proof.verification_method) else {
        return ValidationOutcome::failure(
            ErrorCode::PublicKeyNotFound,
            "could not resolve proof verificationMethod to a public key",
        )
        .with_context("verificationMethod", delegated.proof.verification_method.clone());
    };

    let public_key = match zcap_crypto::PublicKey::from_bytes(&pk_bytes) {
        Ok(pk) => pk,
        Err(_) => {
            return ValidationOutcome::failure(
                ErrorCode::PublicKeyNotFound,
                "resolved public key is structurally invalid",
            )
        }
    };

    let stripped = match zcap_proof::strip_proof(delegated) {
        Ok(v) => v,
        Err(e) => {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                format!("could not serialize capability for verification: {e}"),
            )
        }
    };

    let skew = chrono::Duration::from_std(config.max_clock_skew).unwrap_or(chrono::Duration::zero());
    match zcap_proof::verify(&stripped, &delegated.proof, &public_key, now, skew) {
        Ok(true) => ValidationOutcome::success(),
        Ok(false) => ValidationOutcome::failure(
            ErrorCode::InvalidProofSignature,
            "delegation proof did not verify against the resolved public key",
        ),
        Err(fault) => ValidationOutcome::failure(
            ErrorCode::InvalidProofSignature,
            format!("cryptographic fault while verifying delegation proof: {fault}"),
        ),
    }
}

/// The chain a delegated parent's own lineage is validated against: the
/// parent capability carries its proof's `capabilityChain`, the
/// authoritative record of its own ancestry back to root.
fn parent_own_chain(parent: &DelegatedCapability) -> Result<CapabilityChain, ValidationOutcome> {
    parent.proof.capability_chain.clone().ok_or_else(|| {
        ValidationOutcome::failure(
            ErrorCode::MalformedChain,
            "embedded parent capability is missing its own capabilityChain",
        )
    })
}

/// Validate `leaf` together with its presented `chain`. Pure and
/// side-effect-free apart from calling `resolver.lookup`.
pub fn validate<R: PublicKeyLookup>(
    leaf: &Capability,
    chain: &CapabilityChain,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    match validate_cancellable(leaf, chain, resolver, config, now, &|| false) {
        Ok(outcome) => outcome,
        Err(_) => unreachable!("an always-false cancellation check never cancels"),
    }
}

/// Same as [`validate`], but checked against `is_cancelled` at every phase
/// boundary -- including before recursing into the parent's own chain,
/// the point where a deep chain's remaining work is largest. A deeply
/// nested chain can otherwise walk many hops before returning; callers
/// enforcing a deadline or a user-triggered abort observe it within one
/// phase rather than only at the end.
pub fn validate_cancellable<R: PublicKeyLookup>(
    leaf: &Capability,
    chain: &CapabilityChain,
    resolver: &R,
    config: &EngineConfig,
    now: DateTime<Utc>,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<ValidationOutcome, ZcapFault> {
    if is_cancelled() {
        return Err(ZcapFault::Cancelled);
    }

    let structure = check_structure(leaf, chain);
    if !structure.is_valid {
        tracing::debug!(code = %structure.error_code.unwrap(), "chain validation rejected: structure");
        return Ok(structure);
    }

    if is_cancelled() {
        return Err(ZcapFault::Cancelled);
    }

    let depth_outcome = zcap_model::chain::validate_depth(chain, config.max_chain_depth);
    if !depth_outcome.is_valid {
        tracing::debug!(code = %depth_outcome.error_code.unwrap(), "chain validation rejected: depth");
        return Ok(depth_outcome);
    }

    let continuity = check_continuity(leaf, chain);
    if !continuity.is_valid {
        tracing::debug!(code = %continuity.error_code.unwrap(), "chain validation rejected: continuity");
        return Ok(continuity);
    }

    let Capability::Delegated(delegated) = leaf else {
        // Root is terminal: structure + continuity already confirmed its
        // id matches the percent-encoded-target hash (checked by the
        // capability's own `validate`), nothing further to walk.
        return Ok(ValidationOutcome::success());
    };

    if is_cancelled() {
        return Err(ZcapFault::Cancelled);
    }

    let proof_outcome = check_proof(delegated, resolver, config, now);
    if !proof_outcome.is_valid {
        tracing::debug!(code = %proof_outcome.error_code.unwrap(), "chain validation rejected: proof");
        return Ok(proof_outcome);
    }

    let parent = embedded_parent(chain).expect("checked by check_structure");
    let attenuation = zcap_attenuation::validate(parent, delegated, config, now);
    if !attenuation.is_valid {
        tracing::debug!(code = %attenuation.error_code.unwrap(), "chain validation rejected: attenuation");
        return Ok(attenuation);
    }

    match parent {
        Capability::Root(_) => Ok(ValidationOutcome::success()),
        Capability::Delegated(parent_delegated) => {
            let parent_chain = match parent_own_chain(parent_delegated) {
                Ok(c) => c,
                Err(outcome) => return Ok(outcome),
            };
            validate_cancellable(parent, &parent_chain, resolver, config, now, is_cancelled)
        }
    }
}
