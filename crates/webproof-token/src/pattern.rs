//! URL allow-list patterns for capability scoping.
//!
//! A pattern is an opaque string classified at match time into one of
//! three kinds:
//! - `https://api.example.com/data` - Exact match against the canonical URL
//! - `https://api.example.com/*` - Wildcard: same origin, path prefix
//! - `^https://api\.example\.com/items/\d+$` - Regex over the canonical URL
//!
//! Classification is re-derived on every match; it is total and
//! deterministic, so the same string always lands in the same kind.

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::error::{TokenError, TokenResult};

/// The kind of an allow-list pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Byte-for-byte equality against the canonicalized candidate URL.
    Exact,
    /// Trailing-`*` pattern: same scheme/host/port, path prefix.
    Wildcard,
    /// Regular expression tested against the canonicalized candidate URL.
    Regex,
}

/// Classify a pattern string.
///
/// Regex detection is a heuristic convention, not a general classifier:
/// pattern authors opt into regex matching by using regex syntax (a `^`
/// anchor, a trailing `$` on a non-URL, class shorthands, character
/// classes, repetition quantifiers or groups). A literal URL containing
/// `[]`/`{}` will be treated as a regex; that trade-off is intentional.
#[must_use]
pub fn classify(pattern: &str) -> PatternKind {
    if looks_like_regex(pattern) {
        PatternKind::Regex
    } else if pattern.ends_with('*') {
        PatternKind::Wildcard
    } else {
        PatternKind::Exact
    }
}

fn looks_like_regex(pattern: &str) -> bool {
    if pattern.starts_with('^') {
        return true;
    }
    if pattern.ends_with('$') && !pattern.contains("://") {
        return true;
    }

    // Backslash-escaped class shorthands
    const CLASS_SHORTHANDS: [&str; 6] = ["\\d", "\\D", "\\w", "\\W", "\\s", "\\S"];
    if CLASS_SHORTHANDS.iter().any(|s| pattern.contains(s)) {
        return true;
    }

    // Bracket character class [...]
    if let (Some(open), Some(close)) = (pattern.find('['), pattern.rfind(']')) {
        if open < close {
            return true;
        }
    }

    // Repetition quantifier {m} / {m,} / {m,n}
    if has_repetition_quantifier(pattern) {
        return true;
    }

    // Non-capturing or plain group (...)
    if pattern.contains("(?:") {
        return true;
    }
    if let (Some(open), Some(close)) = (pattern.find('('), pattern.rfind(')')) {
        if open < close {
            return true;
        }
    }

    false
}

/// Scan for a `{m}`, `{m,}` or `{m,n}` quantifier.
fn has_repetition_quantifier(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let mut j = i.saturating_add(1);
            let digits_start = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j = j.saturating_add(1);
            }
            if j > digits_start {
                if j < bytes.len() && bytes[j] == b',' {
                    j = j.saturating_add(1);
                    while j < bytes.len() && bytes[j].is_ascii_digit() {
                        j = j.saturating_add(1);
                    }
                }
                if j < bytes.len() && bytes[j] == b'}' {
                    return true;
                }
            }
        }
        i = i.saturating_add(1);
    }
    false
}

/// Check whether a candidate URL is allowed by a pattern list.
///
/// An empty pattern list means "allow all" - used when only signature
/// validity, not URL scope, is required. Otherwise the candidate must
/// match at least one pattern.
///
/// The candidate is canonicalized by parsing and re-serializing it before
/// any comparison; this normalizes escaping and resolves `.`/`..` path
/// segments, so a double-encoded or traversing URL cannot slip past an
/// exact or prefix comparison. A candidate that does not parse as a URL
/// fails closed.
#[must_use]
pub fn is_url_allowed(candidate: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }

    let Ok(parsed) = Url::parse(candidate) else {
        debug!(url = candidate, "candidate does not parse as a URL, denying");
        return false;
    };
    let canonical = parsed.to_string();

    patterns
        .iter()
        .any(|pattern| pattern_matches(pattern, &canonical, &parsed))
}

fn pattern_matches(pattern: &str, canonical: &str, candidate: &Url) -> bool {
    match classify(pattern) {
        // Invalid regexes are skipped, never fatal: the allow-list may mix
        // pattern kinds from different authors.
        PatternKind::Regex => Regex::new(pattern).is_ok_and(|re| re.is_match(canonical)),
        PatternKind::Exact => canonical == pattern,
        PatternKind::Wildcard => wildcard_matches(pattern, canonical, candidate),
    }
}

fn wildcard_matches(pattern: &str, canonical: &str, candidate: &Url) -> bool {
    let base = strip_wildcard(pattern);

    let Ok(base_url) = Url::parse(base) else {
        // Degraded mode for non-URL bases: plain string prefix. Kept for
        // backward compatibility with loosely-authored allow-lists.
        return canonical.starts_with(base);
    };

    // Origin must match exactly. Prefix matching on the full string would
    // let `https://api.example.com.evil.net/` match `https://api.example.com*`,
    // and scheme or port substitution would survive a string comparison.
    if candidate.scheme() != base_url.scheme() {
        return false;
    }
    if candidate.host_str() != base_url.host_str() {
        return false;
    }
    // An explicitly authored port must be present on the candidate too;
    // `https://x:443/*` and `https://x/*` are distinct scopes.
    if candidate.port() != authored_port(base) {
        return false;
    }

    candidate.path().starts_with(base_url.path())
}

/// Strip a trailing `*`, and the `/` before it if present.
fn strip_wildcard(pattern: &str) -> &str {
    match pattern.strip_suffix('*') {
        Some(without_star) => without_star.strip_suffix('/').unwrap_or(without_star),
        None => pattern,
    }
}

/// Extract the port as it was written in the pattern, if any.
///
/// `Url` drops a scheme-default port during normalization, which would
/// conflate `https://x:443` with `https://x`; this reads the authored
/// authority section instead.
fn authored_port(base: &str) -> Option<u16> {
    let after_scheme = base.split_once("://")?.1;
    let authority_end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let authority = &after_scheme[..authority_end];
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    let port_str = if let Some(bracket) = host_port.rfind(']') {
        // IPv6 literal: port follows the closing bracket
        host_port
            .get(bracket.saturating_add(1)..)?
            .strip_prefix(':')?
    } else {
        host_port.rsplit_once(':')?.1
    };

    port_str.parse().ok()
}

/// Validate a pattern for issuance.
///
/// Issuance is strict where matching is lenient: an empty entry, a
/// regex-classified entry that does not compile, or a non-regex entry
/// whose base (after stripping a single trailing `*`) is not a URL all
/// reject the whole allow-list.
pub(crate) fn validate_pattern(pattern: &str) -> TokenResult<()> {
    if pattern.trim().is_empty() {
        return Err(TokenError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern must be a non-empty string".to_string(),
        });
    }

    if classify(pattern) == PatternKind::Regex {
        Regex::new(pattern).map_err(|e| TokenError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("invalid regex: {e}"),
        })?;
        return Ok(());
    }

    let base = strip_wildcard(pattern);
    Url::parse(base).map_err(|e| TokenError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: format!("invalid URL: {e}"),
    })?;

    Ok(())
}
