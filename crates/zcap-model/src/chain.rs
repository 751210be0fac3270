//! Capability chains: the ordered sequence of identifiers (and, for a
//! delegation proof, one embedded capability) that documents a
//! capability's lineage back to its root.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ErrorCode, ValidationOutcome};

/// Prefix every root capability identifier carries.
pub const ROOT_ID_PREFIX: &str = "urn:zcap:root:";

/// One element of a [`CapabilityChain`]: either a bare identifier, or (only
/// ever the last element, only on a delegation proof) the fully embedded
/// parent capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainElement {
    Id(String),
    Embedded(Box<Capability>),
}

impl ChainElement {
    pub fn id(&self) -> &str {
        match self {
            ChainElement::Id(id) => id,
            ChainElement::Embedded(cap) => cap.id(),
        }
    }

    pub fn as_embedded(&self) -> Option<&Capability> {
        match self {
            ChainElement::Embedded(cap) => Some(cap),
            ChainElement::Id(_) => None,
        }
    }
}

/// An ordered chain of [`ChainElement`]s, root first.
pub type CapabilityChain = Vec<ChainElement>;

/// Structural validation of a chain, independent of any particular leaf:
/// non-empty, first element is a root-prefixed id, no duplicate ids (chains
/// are tree-shaped by construction; a repeated id would be a cycle).
pub fn validate_structure(chain: &CapabilityChain) -> ValidationOutcome {
    let Some(first) = chain.first() else {
        return ValidationOutcome::failure(ErrorCode::EmptyChain, "capability chain is empty");
    };

    match first {
        ChainElement::Id(id) if id.starts_with(ROOT_ID_PREFIX) => {}
        other => {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                "first chain element must be a root-prefixed identifier",
            )
            .with_context("firstElement", other.id());
        }
    }

    let mut seen = HashSet::with_capacity(chain.len());
    for element in chain {
        if !seen.insert(element.id().to_string()) {
            return ValidationOutcome::failure(
                ErrorCode::MalformedChain,
                "capability chain contains a repeated identifier",
            )
            .with_context("repeatedId", element.id());
        }
    }

    ValidationOutcome::success()
}

/// Depth is `len(chain) - 1` below root; a single-element chain (root
/// alone) has depth 0.
pub fn depth(chain: &CapabilityChain) -> usize {
    chain.len().saturating_sub(1)
}

pub fn validate_depth(chain: &CapabilityChain, max_chain_depth: u32) -> ValidationOutcome {
    let d = depth(chain);
    if d as u64 > max_chain_depth as u64 {
        return ValidationOutcome::failure(
            ErrorCode::ChainDepthExceeded,
            format!("chain depth {d} exceeds maximum {max_chain_depth}"),
        )
        .with_context("depth", d.to_string())
        .with_context("maxChainDepth", max_chain_depth.to_string());
    }
    ValidationOutcome::success()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_fails() {
        let outcome = validate_structure(&Vec::new());
        assert_eq!(outcome.error_code, Some(ErrorCode::EmptyChain));
    }

    #[test]
    fn single_root_element_is_structurally_valid() {
        let chain = vec![ChainElement::Id(format!("{ROOT_ID_PREFIX}https%3A%2F%2Fx"))];
        assert!(validate_structure(&chain).is_valid);
        assert_eq!(depth(&chain), 0);
    }

    #[test]
    fn non_root_first_element_fails() {
        let chain = vec![ChainElement::Id("urn:uuid:abc".to_string())];
        let outcome = validate_structure(&chain);
        assert_eq!(outcome.error_code, Some(ErrorCode::MalformedChain));
    }

    #[test]
    fn duplicate_id_is_rejected_as_cycle() {
        let root = format!("{ROOT_ID_PREFIX}https%3A%2F%2Fx");
        let chain = vec![
            ChainElement::Id(root.clone()),
            ChainElement::Id(root.clone()),
        ];
        let outcome = validate_structure(&chain);
        assert_eq!(outcome.error_code, Some(ErrorCode::MalformedChain));
    }

    #[test]
    fn depth_monotonicity_across_max_chain_depth() {
        let chain: CapabilityChain = (0..13)
            .map(|i| ChainElement::Id(format!("urn:uuid:{i}")))
            .collect();
        let rejected_at_10 = validate_depth(&chain, 10);
        assert!(!rejected_at_10.is_valid);
        let accepted_at_20 = validate_depth(&chain, 20);
        assert!(accepted_at_20.is_valid);
    }
}
