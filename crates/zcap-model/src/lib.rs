//! Data model for the ZCAP-LD verification engine: capabilities, proofs,
//! capability chains, caveats, invocations, engine configuration, and the
//! validation/fault error taxonomy every other crate in this workspace
//! builds on.

pub mod capability;
pub mod caveat;
pub mod chain;
pub mod config;
pub mod error;
pub mod invocation;
pub mod oneormany;
pub mod proof;
pub mod uri;

pub use capability::{percent_encode_target, root_capability_id, Capability, DelegatedCapability, RootCapability, ZCAP_CONTEXT};
pub use caveat::{evaluate_caveats, Caveat, CaveatKind, InvocationContext};
pub use chain::{depth, validate_depth, validate_structure, CapabilityChain, ChainElement, ROOT_ID_PREFIX};
pub use config::EngineConfig;
pub use error::{ErrorCode, Result, ValidationContext, ValidationOutcome, ZcapFault};
pub use invocation::{Invocation, InvocationArguments};
pub use oneormany::OneOrMany;
pub use proof::{Proof, ProofPurpose, ED25519_SIGNATURE_2020};
pub use uri::is_absolute_uri;
