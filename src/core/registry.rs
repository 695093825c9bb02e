//! Actor registry.
//!
//! Scans a directory tree for `_actor.yaml` files and indexes the
//! definitions by actor name. Loading fails when an actor's `group`
//! names an actor that is not part of the tree.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Definition;

/// File marking a directory as an actor
pub const DEFINITION_FILE: &str = "_actor.yaml";

/// Registry loading errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Actor directory is not valid UTF-8: {0}")]
    InvalidRoot(PathBuf),

    #[error("Invalid actor search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to load actor definition {path}: {source}")]
    Definition {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Missing the following items: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),
}

/// All actors found below a directory
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
    actors: HashMap<String, Definition>,
}

impl Registry {
    /// Load every actor below `root` and check their dependency groups
    pub fn load(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let root = root.as_ref().to_path_buf();
        let root_str = root
            .to_str()
            .ok_or_else(|| RegistryError::InvalidRoot(root.clone()))?;
        let pattern = format!("{}/**/{}", Pattern::escape(root_str), DEFINITION_FILE);

        let mut actors = HashMap::new();
        for entry in glob::glob(&pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry in actor directory");
                    continue;
                }
            };

            let Some(directory) = path.parent() else {
                continue;
            };
            let name = directory
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let definition = Definition::from_file(&path)
                .map_err(|source| RegistryError::Definition {
                    path: path.clone(),
                    source,
                })?
                .located(name.clone(), directory.to_path_buf(), root.clone());

            debug!(actor = %name, directory = %directory.display(), "Loaded actor");
            actors.insert(name, definition);
        }

        let registry = Self { root, actors };

        let missing = registry.missing_dependencies();
        if !missing.is_empty() {
            return Err(RegistryError::MissingDependencies(missing));
        }

        Ok(registry)
    }

    /// Group references that don't resolve to a loaded actor, sorted
    fn missing_dependencies(&self) -> Vec<String> {
        self.actors
            .values()
            .flat_map(|definition| definition.group.iter())
            .filter(|name| !self.actors.contains_key(name.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Directory this registry was loaded from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get an actor by name
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.actors.get(name)
    }

    /// Actor names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions in name order
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.names().into_iter().filter_map(|name| self.actors.get(name))
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_actor(root: &Path, relative: &str, yaml: &str) {
        let dir = root.join(relative);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFINITION_FILE), yaml).unwrap();
    }

    #[test]
    fn test_missing_dependencies_sorted_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        write_actor(temp.path(), "one", "group: [zeta, alpha]\n");
        write_actor(temp.path(), "two", "group: [alpha]\n");

        match Registry::load(temp.path()) {
            Err(RegistryError::MissingDependencies(missing)) => {
                assert_eq!(missing, vec!["alpha".to_string(), "zeta".to_string()]);
            }
            other => panic!("Expected MissingDependencies, got {:?}", other),
        }
    }

    #[test]
    fn test_names_sorted() {
        let temp = TempDir::new().unwrap();
        write_actor(temp.path(), "b/second", "description: second\n");
        write_actor(temp.path(), "a/first", "description: first\n");

        let registry = Registry::load(temp.path()).unwrap();
        assert_eq!(registry.names(), vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_error_message() {
        let err = RegistryError::MissingDependencies(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Missing the following items: a, b");
    }
}
