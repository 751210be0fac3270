//! Expansion of a ZCAP-LD JSON-LD document into an `oxrdf` dataset.
//!
//! ZCAP-LD documents use a small, closed vocabulary (the terms enumerated
//! in the bundled `zcap/v1` and `ed25519-2020` contexts in [`context`]).
//! Rather than drive the fully generic JSON-LD expansion algorithm over
//! arbitrary documents, this walks the known term set directly and emits
//! the same RDF triples that algorithm would produce for these documents --
//! order-independent by construction, since it reads named fields rather
//! than relying on JSON object key order.

use std::collections::HashMap;

use oxrdf::{BlankNode, Dataset, GraphName, Literal, NamedNode, Quad, Subject, Term};
use serde_json::Value;

use crate::error::CanonError;

const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// term name -> (predicate IRI, is-id-valued).
fn term_map() -> HashMap<&'static str, (&'static str, bool)> {
    let mut m = HashMap::new();
    m.insert("controller", ("https://w3id.org/security#controller", true));
    m.insert(
        "invocationTarget",
        ("https://w3id.org/zcap#invocationTarget", true),
    );
    m.insert(
        "parentCapability",
        ("https://w3id.org/zcap#parentCapability", true),
    );
    m.insert("expires", ("https://w3id.org/security#expiration", false));
    m.insert("allowedAction", ("https://w3id.org/zcap#allowedAction", false));
    m.insert("caveat", ("https://w3id.org/zcap#caveat", true));
    m.insert("invoker", ("https://w3id.org/zcap#invoker", true));
    m.insert(
        "capabilityChain",
        ("https://w3id.org/zcap#capabilityChain", true),
    );
    m.insert("action", ("https://w3id.org/zcap#action", false));
    m.insert("proof", ("https://w3id.org/security#proof", true));
    m.insert(
        "proofPurpose",
        ("https://w3id.org/security#proofPurpose", false),
    );
    m.insert(
        "verificationMethod",
        ("https://w3id.org/security#verificationMethod", true),
    );
    m.insert("created", ("http://purl.org/dc/terms/created", false));
    m.insert("proofValue", ("https://w3id.org/security#proofValue", false));
    m.insert("capability", ("https://w3id.org/zcap#capability", true));
    m
}

fn subject_for(id: Option<&str>, fresh_blank: &mut impl FnMut() -> BlankNode) -> Subject {
    match id {
        Some(id) => Subject::NamedNode(NamedNode::new_unchecked(id.to_string())),
        None => Subject::BlankNode(fresh_blank()),
    }
}

fn literal_term(value: &Value) -> Option<Term> {
    match value {
        Value::String(s) => Some(Term::Literal(Literal::new_simple_literal(s.clone()))),
        Value::Bool(b) => Some(Term::Literal(Literal::new_simple_literal(b.to_string()))),
        Value::Number(n) => Some(Term::Literal(Literal::new_simple_literal(n.to_string()))),
        _ => None,
    }
}

/// Expand a single ZCAP-LD document (capability, proof-bearing document,
/// or invocation) into RDF quads in the default graph.
pub fn document_to_dataset(doc: &Value) -> Result<Dataset, CanonError> {
    let mut dataset = Dataset::new();
    let mut counter: u64 = 0;
    let mut fresh_blank = move || {
        counter += 1;
        BlankNode::new_unchecked(format!("b{counter}"))
    };

    let Value::Object(root) = doc else {
        return Err(CanonError::InvalidJsonLd(
            "top-level ZCAP-LD document must be a JSON object".to_string(),
        ));
    };

    let root_id = root.get("id").and_then(Value::as_str);
    let root_subject = subject_for(root_id, &mut fresh_blank);

    if let Some(type_) = root.get("type").and_then(Value::as_str) {
        dataset.insert(&Quad::new(
            root_subject.clone(),
            NamedNode::new_unchecked(RDF_TYPE),
            Term::NamedNode(NamedNode::new_unchecked(format!(
                "https://w3id.org/security#{type_}"
            ))),
            GraphName::DefaultGraph,
        ));
    }

    let terms = term_map();
    for (key, value) in root {
        if key == "id" || key == "@context" || key == "type" {
            continue;
        }
        let Some(&(predicate, is_id)) = terms.get(key.as_str()) else {
            return Err(CanonError::InvalidJsonLd(format!("unknown term: {key}")));
        };
        emit_field(
            &mut dataset,
            &root_subject,
            predicate,
            is_id,
            key,
            value,
            &terms,
            &mut fresh_blank,
        )?;
    }

    Ok(dataset)
}

#[allow(clippy::too_many_arguments)]
fn emit_field(
    dataset: &mut Dataset,
    subject: &Subject,
    predicate: &str,
    is_id: bool,
    key: &str,
    value: &Value,
    terms: &HashMap<&'static str, (&'static str, bool)>,
    fresh_blank: &mut impl FnMut() -> BlankNode,
) -> Result<(), CanonError> {
    let pred = NamedNode::new_unchecked(predicate.to_string());

    match value {
        Value::Array(items) if key == "capabilityChain" => {
            let list_head = emit_rdf_list(dataset, items, fresh_blank)?;
            dataset.insert(&Quad::new(
                subject.clone(),
                pred,
                list_head,
                GraphName::DefaultGraph,
            ));
        }
        Value::Array(items) => {
            for item in items {
                emit_scalar_or_object(dataset, subject, &pred, is_id, key, item, terms, fresh_blank)?;
            }
        }
        other => {
            emit_scalar_or_object(dataset, subject, &pred, is_id, key, other, terms, fresh_blank)?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn emit_scalar_or_object(
    dataset: &mut Dataset,
    subject: &Subject,
    pred: &NamedNode,
    is_id: bool,
    key: &str,
    value: &Value,
    terms: &HashMap<&'static str, (&'static str, bool)>,
    fresh_blank: &mut impl FnMut() -> BlankNode,
) -> Result<(), CanonError> {
    match value {
        Value::Object(obj) => {
            let nested_id = obj.get("id").and_then(Value::as_str);
            let nested_subject = subject_for(nested_id, fresh_blank);
            dataset.insert(&Quad::new(
                subject.clone(),
                pred.clone(),
                match &nested_subject {
                    Subject::NamedNode(n) => Term::NamedNode(n.clone()),
                    Subject::BlankNode(b) => Term::BlankNode(b.clone()),
                    #[allow(unreachable_patterns)]
                    _ => return Err(CanonError::InvalidJsonLd("unsupported subject kind".into())),
                },
                GraphName::DefaultGraph,
            ));
            for (nested_key, nested_value) in obj {
                if nested_key == "id" || nested_key == "@context" || nested_key == "type" {
                    continue;
                }
                let Some(&(nested_pred, nested_is_id)) = terms.get(nested_key.as_str()) else {
                    return Err(CanonError::InvalidJsonLd(format!(
                        "unknown term: {nested_key}"
                    )));
                };
                emit_field(
                    dataset,
                    &nested_subject,
                    nested_pred,
                    nested_is_id,
                    nested_key,
                    nested_value,
                    terms,
                    fresh_blank,
                )?;
            }
            Ok(())
        }
        Value::String(s) if is_id => {
            dataset.insert(&Quad::new(
                subject.clone(),
                pred.clone(),
                Term::NamedNode(NamedNode::new_unchecked(s.clone())),
                GraphName::DefaultGraph,
            ));
            Ok(())
        }
        Value::String(s) if key == "expires" || key == "created" => {
            dataset.insert(&Quad::new(
                subject.clone(),
                pred.clone(),
                Term::Literal(Literal::new_typed_literal(
                    s.clone(),
                    NamedNode::new_unchecked(XSD_DATE_TIME),
                )),
                GraphName::DefaultGraph,
            ));
            Ok(())
        }
        other => {
            let Some(term) = literal_term(other) else {
                return Err(CanonError::InvalidJsonLd(format!(
                    "cannot represent value of {key} as an RDF term"
                )));
            };
            dataset.insert(&Quad::new(subject.clone(), pred.clone(), term, GraphName::DefaultGraph));
            Ok(())
        }
    }
}

/// Encode a JSON array as an RDF list (`rdf:first`/`rdf:rest` chain),
/// returning the head term (`rdf:nil` for an empty list).
fn emit_rdf_list(
    dataset: &mut Dataset,
    items: &[Value],
    fresh_blank: &mut impl FnMut() -> BlankNode,
) -> Result<Term, CanonError> {
    if items.is_empty() {
        return Ok(Term::NamedNode(NamedNode::new_unchecked(RDF_NIL)));
    }

    let nodes: Vec<BlankNode> = (0..items.len()).map(|_| fresh_blank()).collect();
    let terms = term_map();

    for (i, item) in items.iter().enumerate() {
        let node = &nodes[i];
        let value_term = match item {
            Value::String(s) => Term::NamedNode(NamedNode::new_unchecked(s.clone())),
            Value::Object(obj) => {
                // Embedded parent capability at the tail of a capability chain:
                // its own fields must be walked too, not just its id referenced,
                // or the signed document silently drops the parent's content.
                let nested_subject = subject_for(obj.get("id").and_then(Value::as_str), fresh_blank);
                for (nested_key, nested_value) in obj {
                    if nested_key == "id" || nested_key == "@context" || nested_key == "type" {
                        continue;
                    }
                    let Some(&(nested_pred, nested_is_id)) = terms.get(nested_key.as_str()) else {
                        return Err(CanonError::InvalidJsonLd(format!(
                            "unknown term: {nested_key}"
                        )));
                    };
                    emit_field(
                        dataset,
                        &nested_subject,
                        nested_pred,
                        nested_is_id,
                        nested_key,
                        nested_value,
                        &terms,
                        fresh_blank,
                    )?;
                }
                match &nested_subject {
                    Subject::NamedNode(n) => Term::NamedNode(n.clone()),
                    Subject::BlankNode(b) => Term::BlankNode(b.clone()),
                    #[allow(unreachable_patterns)]
                    _ => return Err(CanonError::InvalidJsonLd("unsupported subject kind".into())),
                }
            }
            other => literal_term(other)
                .ok_or_else(|| CanonError::InvalidJsonLd("invalid capabilityChain element".into()))?,
        };

        dataset.insert(&Quad::new(
            node.clone(),
            NamedNode::new_unchecked(RDF_FIRST),
            value_term,
            GraphName::DefaultGraph,
        ));

        let rest = if i + 1 < nodes.len() {
            Term::BlankNode(nodes[i + 1].clone())
        } else {
            Term::NamedNode(NamedNode::new_unchecked(RDF_NIL))
        };
        dataset.insert(&Quad::new(
            node.clone(),
            NamedNode::new_unchecked(RDF_REST),
            rest,
            GraphName::DefaultGraph,
        ));
    }

    Ok(Term::BlankNode(nodes[0].clone()))
}
