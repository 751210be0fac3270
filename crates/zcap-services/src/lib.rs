//! Delegation and invocation services (`spec.md` §4.7/§4.8): the
//! construct-then-validate layer built on top of the attenuation and
//! chain validators. Where those crates are pure functions over already-
//! formed capabilities, this crate is where a new capability or
//! invocation actually gets built, signed, and handed back to the
//! caller -- or rejected before a signature is ever computed.

pub mod delegation;
pub mod error;
pub mod invocation;

pub use delegation::{delegate, Delegation, DelegationRequest};
pub use error::{Result, ServiceError};
pub use invocation::{invoke, validate_invocation, validate_invocation_strict, InvocationRequest};
