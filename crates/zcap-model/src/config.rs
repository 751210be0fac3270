//! Engine configuration: a typed struct, not a dynamic option bag, with
//! the three preset bundles `spec.md` §6 calls for.

use std::time::Duration;

/// Upper bound on [`EngineConfig::max_chain_depth`]; never set higher.
pub const MAX_CHAIN_DEPTH_CEILING: u32 = 100;
/// Upper bound on [`EngineConfig::max_clock_skew`]; never set higher.
pub const MAX_CLOCK_SKEW_CEILING: Duration = Duration::from_secs(24 * 60 * 60);
/// Lower bound on [`EngineConfig::default_expiration_duration`].
pub const MIN_DEFAULT_EXPIRATION: Duration = Duration::from_secs(60);

/// Engine-wide knobs for validation behavior. Construct with `default()`
/// or one of the named presets, then adjust fields directly -- this is a
/// plain struct, not a builder, since every field is public and cheap to
/// copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_chain_depth: u32,
    pub max_clock_skew: Duration,
    pub enforce_url_attenuation: bool,
    pub enforce_caveat_inheritance: bool,
    pub check_revocation: bool,
    pub default_expiration_duration: Duration,
    pub allow_no_expiration: bool,
    pub validate_proof_signatures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: 10,
            max_clock_skew: Duration::from_secs(5 * 60),
            enforce_url_attenuation: true,
            enforce_caveat_inheritance: true,
            check_revocation: false,
            default_expiration_duration: Duration::from_secs(30 * 24 * 60 * 60),
            allow_no_expiration: false,
            validate_proof_signatures: true,
        }
    }
}

impl EngineConfig {
    /// Depth 5, skew 1 minute, revocation checked. For deployments that
    /// would rather reject than risk an unintended grant.
    pub fn strict() -> Self {
        Self {
            max_chain_depth: 5,
            max_clock_skew: Duration::from_secs(60),
            check_revocation: true,
            ..Self::default()
        }
    }

    /// Depth 20, signature verification OFF. Non-production: useful for
    /// fixture generation and offline chain-shape testing, never for a
    /// deployment that accepts real presented capabilities.
    pub fn lenient() -> Self {
        Self {
            max_chain_depth: 20,
            validate_proof_signatures: false,
            ..Self::default()
        }
    }

    /// Clamp `max_chain_depth`/`max_clock_skew`/`default_expiration_duration`
    /// to the bounds `spec.md` §6 requires. Callers that build a config from
    /// untrusted input should run this before using it.
    pub fn clamped(mut self) -> Self {
        self.max_chain_depth = self.max_chain_depth.min(MAX_CHAIN_DEPTH_CEILING);
        self.max_clock_skew = self.max_clock_skew.min(MAX_CLOCK_SKEW_CEILING);
        self.default_expiration_duration = self
            .default_expiration_duration
            .max(MIN_DEFAULT_EXPIRATION);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_chain_depth, 10);
        assert_eq!(cfg.max_clock_skew, Duration::from_secs(300));
        assert!(cfg.enforce_url_attenuation);
        assert!(cfg.enforce_caveat_inheritance);
        assert!(!cfg.check_revocation);
        assert!(cfg.validate_proof_signatures);
    }

    #[test]
    fn strict_tightens_depth_and_skew() {
        let cfg = EngineConfig::strict();
        assert_eq!(cfg.max_chain_depth, 5);
        assert_eq!(cfg.max_clock_skew, Duration::from_secs(60));
        assert!(cfg.check_revocation);
    }

    #[test]
    fn lenient_disables_signature_verification() {
        let cfg = EngineConfig::lenient();
        assert_eq!(cfg.max_chain_depth, 20);
        assert!(!cfg.validate_proof_signatures);
    }

    #[test]
    fn clamped_enforces_ceilings() {
        let cfg = EngineConfig {
            max_chain_depth: 1000,
            max_clock_skew: Duration::from_secs(60 * 60 * 24 * 30),
            default_expiration_duration: Duration::from_secs(1),
            ..EngineConfig::default()
        }
        .clamped();
        assert_eq!(cfg.max_chain_depth, MAX_CHAIN_DEPTH_CEILING);
        assert_eq!(cfg.max_clock_skew, MAX_CLOCK_SKEW_CEILING);
        assert_eq!(cfg.default_expiration_duration, MIN_DEFAULT_EXPIRATION);
    }
}
