//! Fetch capability: retrieve resource text by path.
//!
//! Fetchers report through a callback and may do so synchronously or from a
//! worker thread. Every failure yields empty text, so a resource that cannot
//! be loaded is analyzed as if it were empty. The failure is only visible in
//! the log.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Receives the fetched text exactly once.
pub type FetchCallback = Box<dyn FnOnce(String) + Send>;

pub trait Fetcher: Send + Sync {
    fn fetch(&self, path: &str, done: FetchCallback);
}

/// Serves resources from memory and completes before `fetch` returns.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    resources: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.resources.insert(path.into(), text.into());
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, path: &str, done: FetchCallback) {
        let text = match self.resources.get(path) {
            Some(text) => text.clone(),
            None => {
                warn!(path, "resource not found; analyzing as empty");
                String::new()
            }
        };
        done(text);
    }
}

/// Reads resources relative to a root directory on the rayon pool.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileFetcher { root: root.into() }
    }

    /// Map a page-relative reference to a local file. Remote references
    /// (`scheme://` or protocol-relative) have no local counterpart.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        if bare.contains("://") || bare.starts_with("//") {
            return None;
        }
        Some(self.root.join(bare.trim_start_matches('/')))
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, path: &str, done: FetchCallback) {
        let target = self.resolve(path);
        let path = path.to_string();
        rayon::spawn(move || {
            let text = match target {
                Some(file) => match fs::read_to_string(&file) {
                    Ok(text) => {
                        debug!(path = %path, bytes = text.len(), "fetched");
                        text
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "fetch failed; analyzing as empty");
                        String::new()
                    }
                },
                None => {
                    warn!(path = %path, "remote resources are not fetched; analyzing as empty");
                    String::new()
                }
            };
            done(text);
        });
    }
}
