// crates/aigos-core/src/policy/host.rs
// ============================================================================
// Module: AIGOS Host Patterns
// Description: Exact and wildcard-suffix domain matchers.
// Purpose: Match outbound destinations against domain allow and deny lists.
// Dependencies: none
// ============================================================================

// ============================================================================
// SECTION: Host Pattern
// ============================================================================

/// Domain allow/deny pattern.
///
/// # Invariants
/// - Patterns and hosts are compared lowercase without a trailing dot.
/// - `*.example.com` matches subdomains only, never `example.com` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Matches every host (`*`).
    Any,
    /// Exact host match.
    Exact(String),
    /// Wildcard suffix match (for example: `*.example.com`).
    WildcardSuffix(String),
}

impl HostPattern {
    /// Parses a pattern string; blank or bare `*.` patterns yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_host(raw);
        if normalized.is_empty() {
            return None;
        }
        if normalized == "*" {
            return Some(Self::Any);
        }
        if let Some(suffix) = normalized.strip_prefix("*.") {
            if suffix.is_empty() {
                return None;
            }
            return Some(Self::WildcardSuffix(suffix.to_string()));
        }
        Some(Self::Exact(normalized))
    }

    /// Returns true when the pattern matches the normalized host.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(value) => host == value,
            Self::WildcardSuffix(suffix) => {
                if host.len() <= suffix.len() || !host.ends_with(suffix.as_str()) {
                    return false;
                }
                let boundary = host.len() - suffix.len() - 1;
                host.as_bytes().get(boundary) == Some(&b'.')
            }
        }
    }
}

/// Parses an iterable of patterns, dropping blanks.
pub(crate) fn parse_host_patterns<I, S>(hosts: I) -> Vec<HostPattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hosts.into_iter().filter_map(|host| HostPattern::parse(host.as_ref())).collect()
}

/// Normalizes a host for matching.
pub(crate) fn normalize_host(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}
