//! Content fetching seam
//!
//! The compiler has no opinion on transport: anything that can answer
//! `can_handle`/`fetch` works as a source of list text. File access lives
//! here; the HTTP fetcher lives in the CLI so the libraries stay
//! network-free.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Error fetching source content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no fetcher can handle source '{0}'")]
    Unsupported(String),
    #[error("failed to read '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http error for '{url}': {message}")]
    Http { url: String, message: String },
}

/// Supplies raw list text for a source identifier (a path or URL).
pub trait ContentFetcher: Send + Sync {
    fn can_handle(&self, source: &str) -> bool;

    fn fetch(&self, source: &str) -> Result<String, FetchError>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl ContentFetcher for FileFetcher {
    fn can_handle(&self, source: &str) -> bool {
        !is_url(source)
    }

    fn fetch(&self, source: &str) -> Result<String, FetchError> {
        fs::read_to_string(source).map_err(|e| FetchError::Io {
            path: source.to_string(),
            source: e,
        })
    }
}

/// In-memory fetcher for tests: maps source ids to content.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    entries: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, content: &str) -> &mut Self {
        self.entries.insert(source.to_string(), content.to_string());
        self
    }
}

impl ContentFetcher for MemoryFetcher {
    fn can_handle(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    fn fetch(&self, source: &str) -> Result<String, FetchError> {
        self.entries
            .get(source)
            .cloned()
            .ok_or_else(|| FetchError::Unsupported(source.to_string()))
    }
}

/// Tries registered fetchers in order; the first that handles the source
/// wins.
#[derive(Default)]
pub struct CompositeFetcher {
    fetchers: Vec<Box<dyn ContentFetcher>>,
}

impl CompositeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, fetcher: Box<dyn ContentFetcher>) -> Self {
        self.fetchers.push(fetcher);
        self
    }
}

impl ContentFetcher for CompositeFetcher {
    fn can_handle(&self, source: &str) -> bool {
        self.fetchers.iter().any(|f| f.can_handle(source))
    }

    fn fetch(&self, source: &str) -> Result<String, FetchError> {
        for fetcher in &self.fetchers {
            if fetcher.can_handle(source) {
                return fetcher.fetch(source);
            }
        }
        Err(FetchError::Unsupported(source.to_string()))
    }
}

pub(crate) fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Resolve an include reference against the including source.
///
/// Absolute paths and URLs pass through unchanged; relative references
/// resolve against the parent's directory (or URL).
pub fn resolve_reference(base: &str, reference: &str) -> String {
    if is_url(reference) || Path::new(reference).is_absolute() {
        return reference.to_string();
    }

    if is_url(base) {
        match url::Url::parse(base).and_then(|b| b.join(reference)) {
            Ok(joined) => return joined.to_string(),
            Err(e) => {
                log::warn!("cannot resolve '{reference}' against '{base}': {e}");
                return reference.to_string();
            }
        }
    }

    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    let joined: PathBuf = parent.join(reference);
    joined.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(resolve_reference("lists/main.txt", "extra.txt"), "lists/extra.txt");
        assert_eq!(resolve_reference("main.txt", "extra.txt"), "extra.txt");
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        assert_eq!(resolve_reference("lists/main.txt", "/abs/extra.txt"), "/abs/extra.txt");
        assert_eq!(
            resolve_reference("lists/main.txt", "https://example.org/x.txt"),
            "https://example.org/x.txt"
        );
    }

    #[test]
    fn test_resolve_against_url() {
        assert_eq!(
            resolve_reference("https://example.org/lists/main.txt", "extra.txt"),
            "https://example.org/lists/extra.txt"
        );
        assert_eq!(
            resolve_reference("https://example.org/lists/main.txt", "../other.txt"),
            "https://example.org/other.txt"
        );
    }

    #[test]
    fn test_memory_fetcher() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("a.txt", "||example.org^");
        assert!(fetcher.can_handle("a.txt"));
        assert!(!fetcher.can_handle("b.txt"));
        assert_eq!(fetcher.fetch("a.txt").unwrap(), "||example.org^");
        assert!(fetcher.fetch("b.txt").is_err());
    }

    #[test]
    fn test_composite_order() {
        let mut mem = MemoryFetcher::new();
        mem.insert("mem:list", "||a.org^");
        let composite = CompositeFetcher::new()
            .register(Box::new(mem))
            .register(Box::new(FileFetcher));
        assert_eq!(composite.fetch("mem:list").unwrap(), "||a.org^");
        assert!(matches!(
            composite.fetch("https://nope.example/x"),
            Err(FetchError::Unsupported(_))
        ));
    }
}
