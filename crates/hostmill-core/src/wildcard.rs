//! Wildcard patterns for inclusion/exclusion filtering
//!
//! A pattern is either a `/regex/` literal (the interior is used verbatim as
//! a case-insensitive regular expression) or a glob where `*` matches any run
//! of characters. Both forms use substring semantics: the pattern may match
//! anywhere within the subject line.

use regex::{Regex, RegexBuilder};

/// Error building a wildcard from a pattern string.
///
/// A malformed `/regex/` interior is a configuration error and must abort
/// compilation; it is never treated as a silent no-match.
#[derive(Debug, thiserror::Error)]
pub enum WildcardError {
    #[error("invalid regex in pattern '{pattern}': {source}")]
    BadRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled inclusion/exclusion pattern.
#[derive(Debug, Clone)]
pub struct Wildcard {
    pattern: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Pure substring match, stored lowercased.
    Plain(String),
    Regex(Regex),
}

impl Wildcard {
    /// Compile a pattern string into a matchable wildcard.
    pub fn compile(pattern: &str) -> Result<Self, WildcardError> {
        let matcher = if pattern.len() > 1 && pattern.starts_with('/') && pattern.ends_with('/') {
            let interior = &pattern[1..pattern.len() - 1];
            Matcher::Regex(build_regex(interior, pattern)?)
        } else {
            let escaped = regex::escape(pattern);
            if escaped == pattern && !pattern.contains('*') {
                Matcher::Plain(pattern.to_lowercase())
            } else {
                let translated = escaped.replace("\\*", ".*");
                Matcher::Regex(build_regex(&translated, pattern)?)
            }
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// The original pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern is a pure substring match with no
    /// meta-characters. Callers may then use literal containment checks;
    /// the result is identical to the compiled path either way.
    pub fn is_plain(&self) -> bool {
        matches!(self.matcher, Matcher::Plain(_))
    }

    /// Test a rule line against this wildcard. Matching is case-insensitive
    /// and succeeds anywhere within the line.
    pub fn matches(&self, rule: &str) -> bool {
        match &self.matcher {
            Matcher::Plain(literal) => rule.to_lowercase().contains(literal.as_str()),
            Matcher::Regex(re) => re.is_match(rule),
        }
    }
}

fn build_regex(expr: &str, pattern: &str) -> Result<Regex, WildcardError> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .build()
        .map_err(|source| WildcardError::BadRegex {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_pattern() {
        let w = Wildcard::compile("example.org").unwrap();
        assert!(w.is_plain());
        assert!(w.matches("||example.org^"));
        assert!(w.matches("EXAMPLE.ORG"));
        assert!(!w.matches("||example.com^"));
    }

    #[test]
    fn test_plain_round_trip() {
        let w = Wildcard::compile("just-a-literal").unwrap();
        assert!(w.is_plain());
        assert!(w.matches("just-a-literal"));
    }

    #[test]
    fn test_glob_pattern() {
        let w = Wildcard::compile("*.example.org").unwrap();
        assert!(!w.is_plain());
        assert!(w.matches("ads.example.org"));
        assert!(w.matches("||sub.example.org^"));
        // '.' is escaped, so it must not match arbitrary characters
        assert!(!w.matches("exampleXorg"));
    }

    #[test]
    fn test_glob_matches_substring() {
        let w = Wildcard::compile("tracker*pixel").unwrap();
        assert!(w.matches("||tracker-one-pixel.net^"));
        assert!(!w.matches("||pixel-tracker.net^"));
    }

    #[test]
    fn test_regex_pattern() {
        let w = Wildcard::compile("/^@@.*ads/").unwrap();
        assert!(!w.is_plain());
        assert!(w.matches("@@||ads.example.org^"));
        assert!(!w.matches("||ads.example.org^"));
    }

    #[test]
    fn test_regex_case_insensitive() {
        let w = Wildcard::compile("/AdServer/").unwrap();
        assert!(w.matches("||adserver.example.org^"));
    }

    #[test]
    fn test_bad_regex_is_error() {
        assert!(Wildcard::compile("/[unclosed/").is_err());
    }

    #[test]
    fn test_slash_without_closing_is_glob() {
        // A lone leading slash is not a regex delimiter pair.
        let w = Wildcard::compile("/banner").unwrap();
        assert!(w.is_plain());
        assert!(w.matches("example.org/banner"));
    }
}
