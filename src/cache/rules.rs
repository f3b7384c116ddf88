//! URL rule classification for the caching policy.
//!
//! Configured URL specifiers carry an optional 3-character trailing marker:
//!
//! | Specifier      | Meaning                                            |
//! |----------------|----------------------------------------------------|
//! | `/status`      | Exact path match                                   |
//! | `/report***`   | Prefix match; query string dropped from cache key  |
//! | `/feed???`     | Prefix match; query string kept in cache key       |
//!
//! The marker convention is a configuration-loading concern: specifiers are
//! resolved once, at construction, into three disjoint ordered collections,
//! so request-time matching never inspects suffixes.

const PREFIX_DROP_QUERY: &str = "***";
const PREFIX_KEEP_QUERY: &str = "???";

/// How a configured URL specifier matches request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// The path must equal the pattern exactly.
    Exact,
    /// The pattern is a literal path prefix; the query string is excluded
    /// from the cache key.
    PrefixDropQuery,
    /// The pattern is a literal path prefix; the query string is included
    /// in the cache key.
    PrefixKeepQuery,
}

/// One configured URL specifier, resolved from its marker form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRule {
    pattern: String,
    mode: RuleMode,
}

impl UrlRule {
    /// Resolves a raw specifier by stripping its trailing marker, if any.
    pub fn parse(raw: &str) -> Self {
        if let Some(prefix) = raw.strip_suffix(PREFIX_DROP_QUERY) {
            return Self {
                pattern: prefix.to_owned(),
                mode: RuleMode::PrefixDropQuery,
            };
        }
        if let Some(prefix) = raw.strip_suffix(PREFIX_KEEP_QUERY) {
            return Self {
                pattern: prefix.to_owned(),
                mode: RuleMode::PrefixKeepQuery,
            };
        }
        Self {
            pattern: raw.to_owned(),
            mode: RuleMode::Exact,
        }
    }

    /// The path (exact) or path prefix (prefix modes) this rule matches.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The resolved match mode.
    pub fn mode(&self) -> RuleMode {
        self.mode
    }
}

/// The classified rule sets, checked in insertion order.
///
/// Classification is total and exclusive: every configured specifier lands in
/// exactly one of the three collections.
#[derive(Debug, Clone, Default)]
pub struct UrlRules {
    exact: Vec<String>,
    prefix_drop_query: Vec<String>,
    prefix_keep_query: Vec<String>,
}

impl UrlRules {
    /// Partitions a flat list of specifiers into the three rule sets.
    pub fn classify<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = Self::default();
        for url in urls {
            let rule = UrlRule::parse(&url.into());
            match rule.mode() {
                RuleMode::Exact => rules.exact.push(rule.pattern),
                RuleMode::PrefixDropQuery => rules.prefix_drop_query.push(rule.pattern),
                RuleMode::PrefixKeepQuery => rules.prefix_keep_query.push(rule.pattern),
            }
        }
        rules
    }

    /// Returns `true` if the path equals an exact rule or starts with any
    /// configured prefix (drop-query prefixes checked first).
    pub fn matches(&self, path: &str) -> bool {
        self.exact.iter().any(|url| url == path) || self.matches_prefix(path)
    }

    /// Returns `true` if the query string belongs in the cache key for this
    /// path.
    ///
    /// Decided solely by membership in the keep-query prefix set — a path may
    /// be cacheable via an exact rule and still resolve to key-without-query.
    pub fn query_in_key(&self, path: &str) -> bool {
        Self::any_prefix(&self.prefix_keep_query, path)
    }

    fn matches_prefix(&self, path: &str) -> bool {
        Self::any_prefix(&self.prefix_drop_query, path)
            || Self::any_prefix(&self.prefix_keep_query, path)
    }

    // Literal prefix test at offset 0, not a path-segment-aware match.
    fn any_prefix(prefixes: &[String], path: &str) -> bool {
        prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_resolve_to_modes() {
        assert_eq!(UrlRule::parse("/status").mode(), RuleMode::Exact);
        assert_eq!(UrlRule::parse("/report***").mode(), RuleMode::PrefixDropQuery);
        assert_eq!(UrlRule::parse("/feed???").mode(), RuleMode::PrefixKeepQuery);
    }

    #[test]
    fn markers_are_stripped_from_patterns() {
        assert_eq!(UrlRule::parse("/report***").pattern(), "/report");
        assert_eq!(UrlRule::parse("/feed???").pattern(), "/feed");
        assert_eq!(UrlRule::parse("/status").pattern(), "/status");
    }

    #[test]
    fn classification_is_exclusive() {
        let rules = UrlRules::classify(["/a", "/b***", "/c???"]);
        assert_eq!(rules.exact, vec!["/a"]);
        assert_eq!(rules.prefix_drop_query, vec!["/b"]);
        assert_eq!(rules.prefix_keep_query, vec!["/c"]);
    }

    #[test]
    fn exact_rules_do_not_match_prefixes() {
        let rules = UrlRules::classify(["/users"]);
        assert!(rules.matches("/users"));
        assert!(!rules.matches("/users/42"));
    }

    #[test]
    fn prefix_match_is_literal_not_segment_aware() {
        let rules = UrlRules::classify(["/report***"]);
        assert!(rules.matches("/report"));
        assert!(rules.matches("/reports/2025")); // substring match at offset 0
        assert!(!rules.matches("/api/report"));
    }

    #[test]
    fn query_in_key_ignores_exact_and_drop_query_rules() {
        let rules = UrlRules::classify(["/status", "/report***", "/feed???"]);
        assert!(!rules.query_in_key("/status"));
        assert!(!rules.query_in_key("/report"));
        assert!(rules.query_in_key("/feed"));
        assert!(rules.query_in_key("/feed/daily"));
    }
}
