//! Caveats: runtime-evaluated restrictions attached to a delegated
//! capability. A closed, tag-dispatched sum type -- an unknown `type` tag
//! is a structural deserialization error, never a silently-dropped
//! restriction.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ValidationOutcome};

/// A single caveat variant. Tagged externally by `type` on the wire
/// (`#[serde(tag = "type")]`), matching the JSON-LD `caveat` array shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Caveat {
    Expiration {
        instant: DateTime<Utc>,
    },
    TimeWindow {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
    Action {
        allowed: Vec<String>,
    },
    UsageCount {
        max: u64,
        current: u64,
    },
    IpAddress {
        cidrs: Vec<String>,
    },
}

/// Discriminant used purely for the caveat-type-presence inheritance
/// check (`spec.md` §4.5) -- distinct caveats of the same variant but
/// different parameters still count as "the same type".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaveatKind {
    Expiration,
    TimeWindow,
    Action,
    UsageCount,
    IpAddress,
}

impl Caveat {
    pub fn kind(&self) -> CaveatKind {
        match self {
            Caveat::Expiration { .. } => CaveatKind::Expiration,
            Caveat::TimeWindow { .. } => CaveatKind::TimeWindow,
            Caveat::Action { .. } => CaveatKind::Action,
            Caveat::UsageCount { .. } => CaveatKind::UsageCount,
            Caveat::IpAddress { .. } => CaveatKind::IpAddress,
        }
    }

    /// Evaluate this caveat against an invocation context. `UsageCount` is
    /// the one variant whose state mutates elsewhere (`bump_usage_count`);
    /// here it only reads `current`.
    pub fn is_satisfied(&self, ctx: &InvocationContext) -> bool {
        match self {
            Caveat::Expiration { instant } => ctx.time < *instant,
            Caveat::TimeWindow { from, until } => ctx.time >= *from && ctx.time < *until,
            Caveat::Action { allowed } => allowed.iter().any(|a| a == &ctx.action),
            Caveat::UsageCount { max, current } => current < max,
            Caveat::IpAddress { cidrs } => match ctx.properties.get("ipAddress") {
                Some(ip_str) => match ip_str.parse::<IpAddr>() {
                    Ok(ip) => cidrs.iter().any(|cidr| cidr_contains(cidr, ip)),
                    Err(_) => false,
                },
                None => false,
            },
        }
    }

    /// Increment a `UsageCount` caveat, returning the new caveat and
    /// whether the increment kept it within bound. The core provides the
    /// arithmetic; persisting the result across invocations is the host's
    /// responsibility (`spec.md` §9).
    pub fn bump_usage_count(&self) -> Option<(Caveat, bool)> {
        match self {
            Caveat::UsageCount { max, current } => {
                let next = current + 1;
                Some((
                    Caveat::UsageCount {
                        max: *max,
                        current: next,
                    },
                    next <= *max,
                ))
            }
            _ => None,
        }
    }
}

/// A minimal CIDR matcher: `a.b.c.d/n` for IPv4, `addr/n` for IPv6.
/// Malformed CIDR strings never match (fail closed).
fn cidr_contains(cidr: &str, ip: IpAddr) -> bool {
    let Some((base, prefix_str)) = cidr.split_once('/') else {
        return match (cidr.parse::<IpAddr>(), ip) {
            (Ok(c), ip) => c == ip,
            _ => false,
        };
    };
    let Ok(prefix_len) = prefix_str.parse::<u32>() else {
        return false;
    };
    let Ok(base_ip) = base.parse::<IpAddr>() else {
        return false;
    };

    match (base_ip, ip) {
        (IpAddr::V4(b), IpAddr::V4(i)) if prefix_len <= 32 => {
            let mask = if prefix_len == 0 {
                0u32
            } else {
                u32::MAX << (32 - prefix_len)
            };
            (u32::from(b) & mask) == (u32::from(i) & mask)
        }
        (IpAddr::V6(b), IpAddr::V6(i)) if prefix_len <= 128 => {
            let mask = if prefix_len == 0 {
                0u128
            } else {
                u128::MAX << (128 - prefix_len)
            };
            (u128::from(b) & mask) == (u128::from(i) & mask)
        }
        _ => false,
    }
}

/// Immutable snapshot used to evaluate caveats against a single
/// invocation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub capability_id: String,
    pub invoker: String,
    pub action: String,
    pub target: String,
    pub time: DateTime<Utc>,
    pub properties: BTreeMap<String, String>,
}

/// Evaluate every caveat in `caveats` against `ctx`; the first unsatisfied
/// caveat produces the failing [`ValidationOutcome`].
pub fn evaluate_caveats(caveats: &[Caveat], ctx: &InvocationContext) -> ValidationOutcome {
    for caveat in caveats {
        if !caveat.is_satisfied(ctx) {
            return ValidationOutcome::failure(
                ErrorCode::CaveatNotSatisfied,
                format!("caveat {:?} not satisfied", caveat.kind()),
            )
            .with_context("caveatType", format!("{:?}", caveat.kind()));
        }
    }
    ValidationOutcome::success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn ctx_at(time: DateTime<Utc>, action: &str) -> InvocationContext {
        InvocationContext {
            capability_id: "urn:uuid:test".to_string(),
            invoker: "did:example:alice".to_string(),
            action: action.to_string(),
            target: "https://api.example.com/users".to_string(),
            time,
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn expiration_satisfied_strictly_before_instant() {
        let now = Utc::now();
        let caveat = Caveat::Expiration {
            instant: now + ChronoDuration::minutes(1),
        };
        assert!(caveat.is_satisfied(&ctx_at(now, "read")));
        let caveat_past = Caveat::Expiration {
            instant: now - ChronoDuration::minutes(1),
        };
        assert!(!caveat_past.is_satisfied(&ctx_at(now, "read")));
    }

    #[test]
    fn time_window_half_open() {
        let now = Utc::now();
        let caveat = Caveat::TimeWindow {
            from: now - ChronoDuration::minutes(1),
            until: now + ChronoDuration::minutes(1),
        };
        assert!(caveat.is_satisfied(&ctx_at(now, "read")));
        assert!(!caveat.is_satisfied(&ctx_at(now + ChronoDuration::minutes(2), "read")));
    }

    #[test]
    fn action_caveat_is_case_sensitive() {
        let caveat = Caveat::Action {
            allowed: vec!["read".to_string()],
        };
        let now = Utc::now();
        assert!(caveat.is_satisfied(&ctx_at(now, "read")));
        assert!(!caveat.is_satisfied(&ctx_at(now, "Read")));
    }

    #[test]
    fn usage_count_bump_reports_overflow() {
        let caveat = Caveat::UsageCount { max: 2, current: 1 };
        let (next, ok) = caveat.bump_usage_count().unwrap();
        assert!(ok);
        assert_eq!(next, Caveat::UsageCount { max: 2, current: 2 });

        let (over, ok) = next.bump_usage_count().unwrap();
        assert!(!ok);
        assert_eq!(over, Caveat::UsageCount { max: 2, current: 3 });
    }

    #[test]
    fn ip_address_matches_cidr() {
        let caveat = Caveat::IpAddress {
            cidrs: vec!["10.0.0.0/8".to_string()],
        };
        let mut ctx = ctx_at(Utc::now(), "read");
        ctx.properties
            .insert("ipAddress".to_string(), "10.1.2.3".to_string());
        assert!(caveat.is_satisfied(&ctx));

        ctx.properties
            .insert("ipAddress".to_string(), "192.168.1.1".to_string());
        assert!(!caveat.is_satisfied(&ctx));
    }

    #[test]
    fn unknown_caveat_tag_is_structural_error() {
        let err = serde_json::from_str::<Caveat>(r#"{"type":"Bogus"}"#).unwrap_err();
        assert!(err.to_string().contains("Bogus") || err.to_string().contains("unknown variant"));
    }

    #[test]
    fn evaluate_caveats_reports_first_failure() {
        let now = Utc::now();
        let caveats = vec![
            Caveat::Action {
                allowed: vec!["read".to_string()],
            },
            Caveat::Expiration {
                instant: now - ChronoDuration::minutes(1),
            },
        ];
        let outcome = evaluate_caveats(&caveats, &ctx_at(now, "write"));
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some(ErrorCode::CaveatNotSatisfied));
    }
}
