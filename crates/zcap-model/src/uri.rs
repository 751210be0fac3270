//! A minimal absolute-URI syntax check.
//!
//! `spec.md` §3 requires every identifier to be "a syntactically valid
//! absolute URI". This workspace has no existing URI-parsing dependency to
//! ground a full RFC 3986 parser on, so this checks exactly the shape the
//! invariant cares about: a scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" /
//! "." )`) followed by `:` and at least one more character. It is
//! deliberately not a complete RFC 3986 validator -- it exists to catch
//! bare paths and empty strings, not to police percent-encoding.
pub fn is_absolute_uri(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let (scheme, rest) = (&s[..colon], &s[colon + 1..]);
    if scheme.is_empty() || rest.is_empty() {
        return false;
    }
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_and_urn() {
        assert!(is_absolute_uri("https://api.example.com/users"));
        assert!(is_absolute_uri("urn:zcap:root:https%3A%2F%2Fx"));
        assert!(is_absolute_uri("did:example:issuer#key-1"));
    }

    #[test]
    fn rejects_relative_and_empty() {
        assert!(!is_absolute_uri("/relative/path"));
        assert!(!is_absolute_uri(""));
        assert!(!is_absolute_uri("no-colon-here"));
        assert!(!is_absolute_uri("1bad:scheme-cant-start-with-digit"));
    }
}
