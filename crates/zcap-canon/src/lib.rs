//! Deterministic byte serialization of a ZCAP-LD document for signing and
//! verification.
//!
//! Implements RDF Dataset Canonicalization (URDNA2015 / RDFC-1.0): the
//! document is expanded into RDF triples against the bundled ZCAP-LD and
//! Ed25519Signature2020 contexts ([`context`]), then the `rdf-canon` crate
//! computes canonical blank-node labels and emits codepoint-sorted N-Quads.
//! `spec.md` §9 is explicit that a string-level JSON sort is not an
//! acceptable substitute -- this is the one component of the ambient Rust
//! Linked-Data stack this workspace otherwise has no precedent for.
//!
//! Expansion ([`expand`]) walks the closed, known term set of the two
//! bundled contexts directly rather than driving the fully generic
//! (and much heavier) JSON-LD expansion algorithm -- ZCAP-LD documents
//! never introduce terms outside that set, and a generic `json-ld`
//! dependency would buy nothing this workspace's documents can use.

pub mod context;
pub mod error;
pub mod expand;

use serde_json::Value;

pub use error::{CanonError, Result};

/// Every `@context` URL a ZCAP-LD document or Data Integrity proof may
/// reference, given this engine resolves contexts from a static, bundled
/// loader rather than the network (`spec.md` §1).
fn check_context_resolvable(doc: &Value) -> Result<()> {
    let Some(context_value) = doc.get("@context") else {
        return Ok(());
    };

    let urls: Vec<&str> = match context_value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };

    for url in urls {
        if context::bundled(url).is_none() {
            return Err(CanonError::ContextResolutionFailed(url.to_string()));
        }
    }
    Ok(())
}

/// Canonicalize `doc` (a capability, invocation, or any proof-bearing
/// document) into its deterministic RDFC-1.0 N-Quads byte serialization.
///
/// Two documents that expand to the same RDF dataset -- regardless of JSON
/// key order, whitespace, or `@context` array arrangement -- produce
/// byte-identical output.
pub fn canonicalize(doc: &Value) -> Result<Vec<u8>> {
    canonicalize_cancellable(doc, &|| false)
}

/// Same as [`canonicalize`], but checked against `is_cancelled` at each
/// phase boundary (context resolution, JSON-LD expansion, RDFC-1.0 blank
/// node labelling) -- the phases a large document or a capability chain
/// with many embedded parents spends the most time in.
pub fn canonicalize_cancellable(doc: &Value, is_cancelled: &dyn Fn() -> bool) -> Result<Vec<u8>> {
    if is_cancelled() {
        return Err(CanonError::Cancelled);
    }
    check_context_resolvable(doc)?;

    if is_cancelled() {
        return Err(CanonError::Cancelled);
    }
    let dataset = expand::document_to_dataset(doc)?;

    if is_cancelled() {
        return Err(CanonError::Cancelled);
    }
    let nquads = rdf_canon::canonicalize(&dataset)
        .map_err(|e| CanonError::CanonicalizationFailed(e.to_string()))?;
    Ok(nquads.into_bytes())
}
