//! Include resolution: where included scripts come from and which ones have
//! already been compiled.

use crate::error::PipelineError;
use crate::grammar::RuleGraph;
use hashbrown::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Text of an included script, with the key that identifies it across
/// include statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    pub key: String,
    pub text: String,
}

/// Resolves include paths to script text.
pub trait SourceLoader {
    /// # Errors
    ///
    /// [`PipelineError::IncludeNotFound`] when no candidate exists,
    /// [`PipelineError::Io`] when one exists but cannot be read.
    fn load(&self, path: &str, search_paths: &[PathBuf]) -> Result<LoadedSource, PipelineError>;
}

/// Loads includes from the file system.
///
/// Relative paths are tried under every search path in order, then as
/// given. The key is the canonical path of the file found.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &str, search_paths: &[PathBuf]) -> Result<LoadedSource, PipelineError> {
        let requested = Path::new(path);
        let candidates: Vec<PathBuf> = if requested.is_absolute() {
            vec![requested.to_path_buf()]
        } else {
            search_paths
                .iter()
                .map(|dir| dir.join(requested))
                .chain(std::iter::once(requested.to_path_buf()))
                .collect()
        };

        for candidate in &candidates {
            if !candidate.is_file() {
                continue;
            }
            let text = fs::read_to_string(candidate).map_err(|source| PipelineError::Io {
                path: candidate.clone(),
                source,
            })?;
            let key = candidate
                .canonicalize()
                .unwrap_or_else(|_| candidate.clone())
                .display()
                .to_string();
            log::debug!("include '{path}' found at {key}");
            return Ok(LoadedSource { key, text });
        }

        Err(PipelineError::IncludeNotFound {
            path: path.to_string(),
            searched: candidates,
        })
    }
}

/// Loads includes from an in-memory table of named scripts.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(path.into(), text.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &str, _search_paths: &[PathBuf]) -> Result<LoadedSource, PipelineError> {
        self.sources
            .get(path)
            .map(|text| LoadedSource {
                key: path.to_string(),
                text: text.clone(),
            })
            .ok_or_else(|| PipelineError::IncludeNotFound {
                path: path.to_string(),
                searched: Vec::new(),
            })
    }
}

/// Compiled includes of one top-level compile, keyed by [`LoadedSource::key`].
///
/// An entry is `None` while its unit is being compiled, so finding it again
/// means the include graph has a cycle.
#[derive(Debug)]
pub(crate) struct IncludeCache<T> {
    entries: HashMap<String, Option<RuleGraph<T>>>,
}

pub(crate) enum CacheState<'c, T> {
    Compiled(&'c RuleGraph<T>),
    InProgress,
    Unseen,
}

impl<T> IncludeCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub(crate) fn state(&self, key: &str) -> CacheState<'_, T> {
        match self.entries.get(key) {
            Some(Some(graph)) => CacheState::Compiled(graph),
            Some(None) => CacheState::InProgress,
            None => CacheState::Unseen,
        }
    }

    pub(crate) fn begin(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), None);
    }

    pub(crate) fn complete(&mut self, key: impl Into<String>, graph: RuleGraph<T>) {
        self.entries.insert(key.into(), Some(graph));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("a.wv", "a = 'a';");
        let loaded = loader.load("a.wv", &[]).unwrap();
        assert_eq!(loaded.key, "a.wv");
        assert_eq!(loaded.text, "a = 'a';");
        assert!(matches!(
            loader.load("b.wv", &[]),
            Err(PipelineError::IncludeNotFound { path, .. }) if path == "b.wv"
        ));
    }

    #[test]
    fn test_fs_loader_reports_searched_paths() {
        let search = vec![PathBuf::from("/nonexistent/weave-a"), PathBuf::from("/nonexistent/weave-b")];
        let Err(PipelineError::IncludeNotFound { searched, .. }) = FsLoader.load("missing.wv", &search) else {
            panic!("expected a missing include");
        };
        assert_eq!(searched.len(), 3);
        assert_eq!(searched[0], PathBuf::from("/nonexistent/weave-a/missing.wv"));
    }

    #[test]
    fn test_fs_loader_reads_from_search_path() {
        let dir = std::env::temp_dir().join(format!("weave-include-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("common.wv"), "common = 'c';").unwrap();

        let loaded = FsLoader.load("common.wv", std::slice::from_ref(&dir)).unwrap();
        assert_eq!(loaded.text, "common = 'c';");
        assert!(loaded.key.ends_with("common.wv"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cache_states() {
        let mut cache = IncludeCache::<char>::new();
        assert!(matches!(cache.state("a"), CacheState::Unseen));
        cache.begin("a");
        assert!(matches!(cache.state("a"), CacheState::InProgress));
        cache.complete("a", RuleGraph::new());
        assert!(matches!(cache.state("a"), CacheState::Compiled(graph) if graph.is_empty()));
    }
}
