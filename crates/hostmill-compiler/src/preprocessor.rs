//! Preprocessor directives
//!
//! Expands `!#include` references, evaluates `!#if`/`!#else`/`!#endif`
//! blocks, and strips `!#safari_cb_affinity` sections before any rule
//! parsing happens. Include resolution is guarded by a per-invocation
//! visited set (cycles contribute zero lines) and a recursion depth bound.

use std::collections::HashSet;

use log::warn;

use crate::conditions;
use crate::fetch::{resolve_reference, ContentFetcher, FetchError};

const INCLUDE_DIRECTIVE: &str = "!#include";
const IF_DIRECTIVE: &str = "!#if";
const ELSE_DIRECTIVE: &str = "!#else";
const ENDIF_DIRECTIVE: &str = "!#endif";
const AFFINITY_DIRECTIVE: &str = "!#safari_cb_affinity";

/// Expands directives in fetched source text.
pub struct DirectiveResolver<'a> {
    fetcher: &'a dyn ContentFetcher,
    max_depth: usize,
    target_platform: Option<&'a str>,
}

impl<'a> DirectiveResolver<'a> {
    pub fn new(
        fetcher: &'a dyn ContentFetcher,
        max_depth: usize,
        target_platform: Option<&'a str>,
    ) -> Self {
        Self {
            fetcher,
            max_depth,
            target_platform,
        }
    }

    /// Fetch a top-level source and expand every directive, producing the
    /// final flattened, directive-free lines. A fetch failure of the
    /// top-level source itself is an error; failures of included
    /// sub-resources are warnings contributing zero lines.
    pub fn resolve(&self, source_id: &str) -> Result<Vec<String>, FetchError> {
        let content = self.fetcher.fetch(source_id)?;
        let mut visited = HashSet::new();
        visited.insert(source_id.to_string());

        let lines: Vec<&str> = content.lines().collect();
        Ok(self.resolve_lines(&lines, source_id, &mut visited, 0))
    }

    fn resolve_lines(
        &self,
        lines: &[&str],
        base: &str,
        visited: &mut HashSet<String>,
        depth: usize,
    ) -> Vec<String> {
        let mut out = Vec::with_capacity(lines.len());
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let directive = line.trim();

            if let Some(rest) = strip_directive(directive, INCLUDE_DIRECTIVE) {
                self.expand_include(rest.trim(), base, visited, depth, &mut out);
                i += 1;
            } else if strip_directive(directive, AFFINITY_DIRECTIVE).is_some() {
                i = skip_affinity_block(lines, i);
            } else if let Some(condition) = strip_directive(directive, IF_DIRECTIVE) {
                let (block, next) = collect_conditional(lines, i);
                match block {
                    Some(block) => {
                        let branch = if conditions::evaluate(condition, self.target_platform) {
                            block.taken
                        } else {
                            block.other
                        };
                        let expanded = self.resolve_lines(&branch, base, visited, depth);
                        out.extend(expanded);
                    }
                    None => {
                        warn!("unterminated !#if in '{base}', dropping the block");
                    }
                }
                i = next;
            } else if directive == ELSE_DIRECTIVE || directive == ENDIF_DIRECTIVE {
                // Stray delimiter outside an !#if scan.
                i += 1;
            } else {
                out.push(line.to_string());
                i += 1;
            }
        }

        out
    }

    fn expand_include(
        &self,
        reference: &str,
        base: &str,
        visited: &mut HashSet<String>,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if reference.is_empty() {
            warn!("!#include without a path in '{base}', ignoring");
            return;
        }

        let resolved = resolve_reference(base, reference);

        if visited.contains(&resolved) {
            warn!("circular !#include of '{resolved}' from '{base}', ignoring");
            return;
        }
        if depth + 1 > self.max_depth {
            warn!("!#include of '{resolved}' exceeds depth limit {}, ignoring", self.max_depth);
            return;
        }

        let content = match self.fetcher.fetch(&resolved) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to fetch included source '{resolved}': {e}");
                return;
            }
        };

        visited.insert(resolved.clone());
        let lines: Vec<&str> = content.lines().collect();
        out.extend(self.resolve_lines(&lines, &resolved, visited, depth + 1));
    }
}

/// Strip a directive prefix. The directive must be the whole word: either
/// the line equals it or a separator follows (space or `(` for the affinity
/// form).
fn strip_directive<'b>(line: &'b str, directive: &str) -> Option<&'b str> {
    let rest = line.strip_prefix(directive)?;
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('(') {
        Some(rest)
    } else {
        None
    }
}

/// Lines collected for one `!#if` block.
struct ConditionalBlock<'b> {
    /// Lines of the branch taken when the condition holds.
    taken: Vec<&'b str>,
    /// Lines of the `!#else` branch.
    other: Vec<&'b str>,
}

/// Collect the `!#if` block starting at `start`. Nested blocks are matched
/// with a nesting counter; only delimiters at the outer level split the
/// branches. Returns the block (or `None` when no matching `!#endif`
/// exists) and the index of the first line after the block.
fn collect_conditional<'b>(lines: &[&'b str], start: usize) -> (Option<ConditionalBlock<'b>>, usize) {
    let mut taken = Vec::new();
    let mut other = Vec::new();
    let mut in_else = false;
    let mut nesting = 1;
    let mut i = start + 1;

    while i < lines.len() {
        let directive = lines[i].trim();

        if strip_directive(directive, IF_DIRECTIVE).is_some() {
            nesting += 1;
        } else if directive == ENDIF_DIRECTIVE {
            nesting -= 1;
            if nesting == 0 {
                return (Some(ConditionalBlock { taken, other }), i + 1);
            }
        } else if directive == ELSE_DIRECTIVE && nesting == 1 {
            in_else = true;
            i += 1;
            continue;
        }

        if in_else {
            other.push(lines[i]);
        } else {
            taken.push(lines[i]);
        }
        i += 1;
    }

    (None, i)
}

/// Skip an affinity block: everything up to and including the next line
/// carrying the same directive. An unclosed block drops the remainder.
fn skip_affinity_block(lines: &[&str], start: usize) -> usize {
    let mut i = start + 1;
    while i < lines.len() {
        if strip_directive(lines[i].trim(), AFFINITY_DIRECTIVE).is_some() {
            return i + 1;
        }
        i += 1;
    }
    warn!("unterminated !#safari_cb_affinity block, dropping the remainder");
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    fn resolve_with(fetcher: &MemoryFetcher, source: &str) -> Vec<String> {
        DirectiveResolver::new(fetcher, 10, None)
            .resolve(source)
            .unwrap()
    }

    fn resolve_for_platform(
        fetcher: &MemoryFetcher,
        source: &str,
        platform: &str,
    ) -> Vec<String> {
        DirectiveResolver::new(fetcher, 10, Some(platform))
            .resolve(source)
            .unwrap()
    }

    #[test]
    fn test_passthrough() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "||a.org^\n! comment\n||b.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^", "! comment", "||b.org^"]);
    }

    #[test]
    fn test_include_splice() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "||a.org^\n!#include child\n||c.org^");
        f.insert("child", "||b.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^", "||b.org^", "||c.org^"]);
    }

    #[test]
    fn test_include_cycle_terminates_empty() {
        let mut f = MemoryFetcher::new();
        f.insert("a", "!#include b");
        f.insert("b", "!#include a");
        assert_eq!(resolve_with(&f, "a"), Vec::<String>::new());
    }

    #[test]
    fn test_include_depth_bound() {
        let mut f = MemoryFetcher::new();
        f.insert("d0", "zero\n!#include d1");
        f.insert("d1", "one\n!#include d2");
        f.insert("d2", "two\n!#include d3");
        f.insert("d3", "three");

        let lines = DirectiveResolver::new(&f, 2, None).resolve("d0").unwrap();
        assert_eq!(lines, vec!["zero", "one", "two"]);
    }

    #[test]
    fn test_failed_include_contributes_nothing() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "||a.org^\n!#include missing\n||b.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^", "||b.org^"]);
    }

    #[test]
    fn test_conditional_else_branch() {
        let mut f = MemoryFetcher::new();
        f.insert(
            "main",
            "rule1\n!#if false\nrule2\n!#else\nrule3\n!#endif\nrule4",
        );
        assert_eq!(resolve_with(&f, "main"), vec!["rule1", "rule3", "rule4"]);
    }

    #[test]
    fn test_conditional_taken_branch() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "!#if true\nkept\n!#else\ndropped\n!#endif");
        assert_eq!(resolve_with(&f, "main"), vec!["kept"]);
    }

    #[test]
    fn test_nested_conditionals() {
        let mut f = MemoryFetcher::new();
        f.insert(
            "main",
            "!#if true\nouter\n!#if false\ninner-if\n!#else\ninner-else\n!#endif\n!#endif",
        );
        assert_eq!(resolve_with(&f, "main"), vec!["outer", "inner-else"]);
    }

    #[test]
    fn test_include_inside_conditional() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "!#if true\n!#include child\n!#endif");
        f.insert("child", "||a.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^"]);
    }

    #[test]
    fn test_platform_condition() {
        let mut f = MemoryFetcher::new();
        f.insert(
            "main",
            "!#if adguard_app_windows\nwindows\n!#else\nother\n!#endif",
        );
        assert_eq!(resolve_with(&f, "main"), vec!["other"]);
        assert_eq!(
            resolve_for_platform(&f, "main", "adguard_app_windows"),
            vec!["windows"]
        );
    }

    #[test]
    fn test_affinity_block_dropped() {
        let mut f = MemoryFetcher::new();
        f.insert(
            "main",
            "||a.org^\n!#safari_cb_affinity(general)\n||dropped.org^\n!#safari_cb_affinity\n||b.org^",
        );
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^", "||b.org^"]);
    }

    #[test]
    fn test_stray_delimiters_dropped() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "||a.org^\n!#endif\n!#else\n||b.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^", "||b.org^"]);
    }

    #[test]
    fn test_unterminated_if_drops_block() {
        let mut f = MemoryFetcher::new();
        f.insert("main", "||a.org^\n!#if true\n||b.org^");
        assert_eq!(resolve_with(&f, "main"), vec!["||a.org^"]);
    }

    #[test]
    fn test_relative_include_resolution() {
        let mut f = MemoryFetcher::new();
        f.insert("lists/main.txt", "!#include extra.txt");
        f.insert("lists/extra.txt", "||a.org^");
        assert_eq!(resolve_with(&f, "lists/main.txt"), vec!["||a.org^"]);
    }
}
