//! Bundled, offline JSON-LD context documents.
//!
//! `spec.md` §1 puts "JSON-LD context resolution over the network" out of
//! scope; the two contexts every ZCAP-LD document can reference are
//! embedded here and served from memory, never fetched.

/// The `https://w3id.org/zcap/v1` context: terms for capabilities,
/// delegation, invocation, and caveats.
pub const ZCAP_V1_CONTEXT: &str = r#"{
  "@context": {
    "id": "@id",
    "type": "@type",
    "zcap": "https://w3id.org/zcap#",
    "sec": "https://w3id.org/security#",
    "controller": { "@id": "sec:controller", "@type": "@id" },
    "invocationTarget": { "@id": "zcap:invocationTarget", "@type": "@id" },
    "parentCapability": { "@id": "zcap:parentCapability", "@type": "@id" },
    "expires": { "@id": "sec:expiration", "@type": "xsd:dateTime" },
    "allowedAction": "zcap:allowedAction",
    "caveat": { "@id": "zcap:caveat", "@type": "@id", "@container": "@set" },
    "invoker": { "@id": "zcap:invoker", "@type": "@id" },
    "capabilityChain": { "@id": "zcap:capabilityChain", "@container": "@list" },
    "action": "zcap:action",
    "xsd": "http://www.w3.org/2001/XMLSchema#"
  }
}"#;

/// The `https://w3id.org/security/suites/ed25519-2020/v1` context: terms
/// for the Data Integrity proof object.
pub const ED25519_2020_CONTEXT: &str = r#"{
  "@context": {
    "id": "@id",
    "type": "@type",
    "sec": "https://w3id.org/security#",
    "xsd": "http://www.w3.org/2001/XMLSchema#",
    "proof": { "@id": "sec:proof", "@type": "@id", "@container": "@graph" },
    "proofPurpose": { "@id": "sec:proofPurpose", "@type": "@vocab" },
    "capabilityDelegation": "sec:capabilityDelegationMethod",
    "capabilityInvocation": "sec:capabilityInvocationMethod",
    "verificationMethod": { "@id": "sec:verificationMethod", "@type": "@id" },
    "created": { "@id": "http://purl.org/dc/terms/created", "@type": "xsd:dateTime" },
    "proofValue": { "@id": "sec:proofValue", "@type": "sec:multibase" },
    "capability": { "@id": "zcap:capability", "@type": "@id" },
    "Ed25519Signature2020": "sec:Ed25519Signature2020"
  }
}"#;

pub const ZCAP_V1_URL: &str = "https://w3id.org/zcap/v1";
pub const ED25519_2020_URL: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Look up a bundled context document by its canonical URL.
pub fn bundled(url: &str) -> Option<&'static str> {
    match url {
        ZCAP_V1_URL => Some(ZCAP_V1_CONTEXT),
        ED25519_2020_URL => Some(ED25519_2020_CONTEXT),
        _ => None,
    }
}
