//! Pure `(parent, child)` attenuation validation: the URL suffix rule, the
//! expiration rule, the action-subset rule, and the caveat-inheritance
//! rule, run in a fixed order so the reported error code is deterministic
//! for a given input pair.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use zcap_model::{Capability, DelegatedCapability, EngineConfig, ErrorCode, ValidationOutcome};

/// Case-insensitive-on-scheme-and-authority, byte-exact-on-path string
/// comparison helper: lowercase everything up to (not including) the
/// first `/` after `scheme://authority`.
fn normalize_case(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let after_scheme = scheme_end + 3;
    let path_start = url[after_scheme..]
        .find('/')
        .map(|i| after_scheme + i)
        .unwrap_or(url.len());
    format!("{}{}", url[..path_start].to_lowercase(), &url[path_start..])
}

/// The normative "path-suffix-or-equal" URL attenuation rule. The
/// query-aware `&`-alternative formulation is out of scope (`spec.md` §9
/// Open Question #1).
pub fn url_attenuation_ok(parent_target: &str, child_target: &str) -> bool {
    let parent_norm = normalize_case(parent_target);
    let child_norm = normalize_case(child_target);

    let parent_had_trailing_slash = parent_norm.ends_with('/');
    let p = parent_norm.strip_suffix('/').unwrap_or(&parent_norm);
    let c = child_norm.strip_suffix('/').unwrap_or(&child_norm);

    if c.len() < p.len() {
        return false;
    }
    if c == p {
        return true;
    }
    if !c.starts_with(p) {
        return false;
    }
    if parent_had_trailing_slash {
        return true;
    }
    c.as_bytes()[p.len()] == b'/'
}

fn check_url_rule(parent: &Capability, child: &DelegatedCapability) -> ValidationOutcome {
    let parent_target = parent.invocation_target();
    let child_target = &child.invocation_target;
    if url_attenuation_ok(parent_target, child_target) {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::UrlAttenuationViolation,
            "child invocation target is not equal to or a path suffix of the parent's",
        )
        .with_context("parentTarget", parent_target.to_string())
        .with_context("childTarget", child_target.clone())
    }
}

fn check_expiration_rule(
    parent: &Capability,
    child: &DelegatedCapability,
    now: DateTime<Utc>,
    skew: chrono::Duration,
) -> ValidationOutcome {
    if child.expires <= now - skew {
        return ValidationOutcome::failure(ErrorCode::CapabilityExpired, "child capability expired")
            .with_context("expires", child.expires.to_rfc3339());
    }

    if let Some(parent_expires) = parent.expires() {
        if parent_expires < now - skew {
            return ValidationOutcome::failure(
                ErrorCode::ParentCapabilityExpired,
                "parent capability expired",
            )
            .with_context("parentExpires", parent_expires.to_rfc3339());
        }
        if child.expires > parent_expires + skew {
            return ValidationOutcome::failure(
                ErrorCode::ExpirationAttenuationViolation,
                "child expiration exceeds parent expiration",
            )
            .with_context("childExpires", child.expires.to_rfc3339())
            .with_context("parentExpires", parent_expires.to_rfc3339());
        }
    }

    ValidationOutcome::success()
}

fn check_action_rule(parent: &Capability, child: &DelegatedCapability) -> ValidationOutcome {
    let Some(parent_actions) = parent.actions() else {
        return ValidationOutcome::success();
    };
    let Some(child_actions) = child.actions() else {
        return ValidationOutcome::success();
    };

    let parent_lower: BTreeSet<String> = parent_actions.iter().map(|a| a.to_lowercase()).collect();
    let offending: Vec<String> = child_actions
        .iter()
        .filter(|a| !parent_lower.contains(&a.to_lowercase()))
        .cloned()
        .collect();

    if offending.is_empty() {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::ActionAttenuationViolation,
            "child allowed actions are not a subset of the parent's",
        )
        .with_context("offendingActions", offending.join(","))
    }
}

fn check_caveat_inheritance_rule(
    parent: &Capability,
    child: &DelegatedCapability,
) -> ValidationOutcome {
    let parent_kinds: BTreeSet<_> = parent.caveats().iter().map(|c| c.kind()).collect();
    let child_kinds: BTreeSet<_> = child.caveats().iter().map(|c| c.kind()).collect();

    let missing: Vec<&str> = parent_kinds
        .iter()
        .filter(|k| !child_kinds.contains(k))
        .map(|k| caveat_kind_name(*k))
        .collect();

    if missing.is_empty() {
        ValidationOutcome::success()
    } else {
        ValidationOutcome::failure(
            ErrorCode::CaveatInheritanceViolation,
            "child is missing a caveat type present on the parent",
        )
        .with_context("missingCaveatTypes", missing.join(","))
    }
}

fn caveat_kind_name(kind: zcap_model::CaveatKind) -> &'static str {
    match kind {
        zcap_model::CaveatKind::Expiration => "Expiration",
        zcap_model::CaveatKind::TimeWindow => "TimeWindow",
        zcap_model::CaveatKind::Action => "Action",
        zcap_model::CaveatKind::UsageCount => "UsageCount",
        zcap_model::CaveatKind::IpAddress => "IpAddress",
    }
}

/// Run every enabled attenuation rule, in the fixed order URL →
/// expiration → action → caveat-inheritance, returning the first failure.
pub fn validate(
    parent: &Capability,
    child: &DelegatedCapability,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    let skew = chrono::Duration::from_std(config.max_clock_skew).unwrap_or(chrono::Duration::zero());

    if config.enforce_url_attenuation {
        let outcome = check_url_rule(parent, child);
        if !outcome.is_valid {
            tracing::debug!(code = %outcome.error_code.unwrap(), "attenuation rejected: url rule");
            return outcome;
        }
    }

    let outcome = check_expiration_rule(parent, child, now, skew);
    if !outcome.is_valid {
        tracing::debug!(code = %outcome.error_code.unwrap(), "attenuation rejected: expiration rule");
        return outcome;
    }

    let outcome = check_action_rule(parent, child);
    if !outcome.is_valid {
        tracing::debug!(code = %outcome.error_code.unwrap(), "attenuation rejected: action rule");
        return outcome;
    }

    if config.enforce_caveat_inheritance {
        let outcome = check_caveat_inheritance_rule(parent, child);
        if !outcome.is_valid {
            tracing::debug!(code = %outcome.error_code.unwrap(), "attenuation rejected: caveat inheritance rule");
            return outcome;
        }
    }

    ValidationOutcome::success()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_target_succeeds() {
        assert!(url_attenuation_ok("https://x/api", "https://x/api"));
    }

    #[test]
    fn trailing_slash_on_child_succeeds() {
        assert!(url_attenuation_ok("https://x/api", "https://x/api/"));
    }

    #[test]
    fn path_extension_succeeds() {
        assert!(url_attenuation_ok("https://x/api", "https://x/api/users"));
    }

    #[test]
    fn hyphenated_sibling_path_is_rejected() {
        assert!(!url_attenuation_ok("https://x/api", "https://x/api-v2"));
    }

    #[test]
    fn shorter_child_is_rejected() {
        assert!(!url_attenuation_ok("https://x/api/users", "https://x/api"));
    }

    #[test]
    fn scheme_and_host_are_case_insensitive_but_path_is_not() {
        assert!(url_attenuation_ok("HTTPS://X/api", "https://x/api/Users"));
        assert!(!url_attenuation_ok("https://x/Api", "https://x/api/users"));
    }

    fn root(target: &str, controller: &str) -> Capability {
        Capability::Root(zcap_model::RootCapability::new(target, controller.to_string()))
    }

    fn delegated_child(
        parent: &Capability,
        target: &str,
        expires: DateTime<Utc>,
        actions: Option<Vec<&str>>,
        caveats: Vec<zcap_model::Caveat>,
    ) -> DelegatedCapability {
        DelegatedCapability {
            context: zcap_model::OneOrMany::one(zcap_model::ZCAP_CONTEXT.to_string()),
            id: "urn:uuid:child".to_string(),
            controller: zcap_model::OneOrMany::one("did:example:alice".to_string()),
            invocation_target: target.to_string(),
            parent_capability: parent.id().to_string(),
            expires,
            proof: sample_proof(),
            allowed_action: actions
                .map(|a| zcap_model::OneOrMany::Many(a.into_iter().map(String::from).collect())),
            caveat: if caveats.is_empty() { None } else { Some(caveats) },
            invoker: None,
        }
    }

    fn sample_proof() -> zcap_model::Proof {
        zcap_model::Proof {
            type_: zcap_model::ED25519_SIGNATURE_2020.to_string(),
            created: Utc::now(),
            proof_purpose: zcap_model::ProofPurpose::CapabilityDelegation,
            verification_method: "did:example:issuer#key-1".to_string(),
            proof_value: "zSIG".to_string(),
            capability_chain: None,
            capability: None,
        }
    }

    #[test]
    fn scenario_two_single_delegation_good() {
        let parent = root("https://api.example.com", "did:example:issuer");
        let child = delegated_child(
            &parent,
            "https://api.example.com/users",
            Utc::now() + chrono::Duration::days(30),
            Some(vec!["read", "write"]),
            vec![],
        );
        let outcome = validate(&parent, &child, &EngineConfig::default(), Utc::now());
        assert!(outcome.is_valid);
    }

    #[test]
    fn scenario_three_url_violation_precedes_everything_else() {
        let parent = root("https://api.example.com", "did:example:issuer");
        let child = delegated_child(
            &parent,
            "https://api.example.com/posts",
            Utc::now() + chrono::Duration::days(30),
            Some(vec!["read", "write"]),
            vec![],
        );
        let outcome = validate(&parent, &child, &EngineConfig::default(), Utc::now());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some(ErrorCode::UrlAttenuationViolation));
    }

    #[test]
    fn scenario_five_action_violation() {
        let root_cap = root("https://api.example.com", "did:example:issuer");
        let alice = delegated_child(
            &root_cap,
            "https://api.example.com/users",
            Utc::now() + chrono::Duration::days(90),
            Some(vec!["read"]),
            vec![],
        );
        let alice_cap = Capability::Delegated(alice);
        let bob = delegated_child(
            &alice_cap,
            "https://api.example.com/users/123",
            Utc::now() + chrono::Duration::days(30),
            Some(vec!["delete"]),
            vec![],
        );
        let outcome = validate(&alice_cap, &bob, &EngineConfig::default(), Utc::now());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some(ErrorCode::ActionAttenuationViolation));
        assert_eq!(outcome.context.get("offendingActions").unwrap(), "delete");
    }

    #[test]
    fn expiration_exactly_equal_to_parent_succeeds_one_ms_past_fails() {
        let parent_expires = Utc::now() + chrono::Duration::days(10);
        let root_cap = Capability::Delegated(DelegatedCapability {
            context: zcap_model::OneOrMany::one(zcap_model::ZCAP_CONTEXT.to_string()),
            id: "urn:uuid:parent".to_string(),
            controller: zcap_model::OneOrMany::one("did:example:issuer".to_string()),
            invocation_target: "https://api.example.com".to_string(),
            parent_capability: root_capability_id_for_test(),
            expires: parent_expires,
            proof: sample_proof(),
            allowed_action: None,
            caveat: None,
            invoker: None,
        });

        let config = EngineConfig {
            max_clock_skew: std::time::Duration::from_secs(0),
            ..EngineConfig::default()
        };

        let equal_child = delegated_child(
            &root_cap,
            "https://api.example.com",
            parent_expires,
            None,
            vec![],
        );
        assert!(validate(&root_cap, &equal_child, &config, Utc::now()).is_valid);

        let past_child = delegated_child(
            &root_cap,
            "https://api.example.com",
            parent_expires + chrono::Duration::milliseconds(1),
            None,
            vec![],
        );
        let outcome = validate(&root_cap, &past_child, &config, Utc::now());
        assert_eq!(
            outcome.error_code,
            Some(ErrorCode::ExpirationAttenuationViolation)
        );
    }

    fn root_capability_id_for_test() -> String {
        zcap_model::root_capability_id("https://api.example.com")
    }

    #[test]
    fn caveat_inheritance_requires_type_presence_only() {
        let root_cap = root("https://api.example.com", "did:example:issuer");
        let parent_with_caveat = {
            let d = delegated_child(
                &root_cap,
                "https://api.example.com/users",
                Utc::now() + chrono::Duration::days(90),
                None,
                vec![zcap_model::Caveat::Expiration {
                    instant: Utc::now() + chrono::Duration::days(90),
                }],
            );
            Capability::Delegated(d)
        };

        let child_missing = delegated_child(
            &parent_with_caveat,
            "https://api.example.com/users/123",
            Utc::now() + chrono::Duration::days(30),
            None,
            vec![],
        );
        let outcome = validate(&parent_with_caveat, &child_missing, &EngineConfig::default(), Utc::now());
        assert_eq!(outcome.error_code, Some(ErrorCode::CaveatInheritanceViolation));

        let child_with_different_params = delegated_child(
            &parent_with_caveat,
            "https://api.example.com/users/123",
            Utc::now() + chrono::Duration::days(30),
            None,
            vec![zcap_model::Caveat::Expiration {
                instant: Utc::now() + chrono::Duration::days(5),
            }],
        );
        assert!(validate(&parent_with_caveat, &child_with_different_params, &EngineConfig::default(), Utc::now()).is_valid);
    }
}
