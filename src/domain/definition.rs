//! Actor definitions.
//!
//! Each actor lives in its own directory containing an `_actor.yaml`
//! file describing its channels and how it is executed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Version assumed for channel types that do not name one
pub const DEFAULT_TYPE_VERSION: &str = "latest";

/// Host used by a `remote` section without an explicit host
pub const DEFAULT_REMOTE_HOST: &str = "localhost";

/// User used by a `remote` section without an explicit user
pub const DEFAULT_REMOTE_USER: &str = "root";

/// A complete actor definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// Actor name (the containing directory's base name)
    #[serde(skip)]
    pub name: String,

    /// Directory the definition was loaded from
    #[serde(skip)]
    pub directory: PathBuf,

    /// Root of the registry that loaded this definition
    #[serde(skip)]
    pub repository: PathBuf,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub description: String,

    /// Channels read from the store and fed to the actor
    #[serde(default)]
    pub inputs: Vec<ChannelDecl>,

    /// Channels the actor is expected to produce
    #[serde(default)]
    pub outputs: Vec<ChannelDecl>,

    #[serde(default)]
    pub execute: Option<ExecuteSpec>,

    /// When present the actor is run on a remote host
    #[serde(default)]
    pub remote: Option<RemoteSpec>,

    /// Names of actors that must exist in the same registry
    #[serde(default)]
    pub group: Vec<String>,
}

impl Definition {
    /// Load a definition from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read actor definition: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a definition from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse actor definition YAML")
    }

    /// Attach the identity assigned by the registry
    pub fn located(mut self, name: impl Into<String>, directory: PathBuf, repository: PathBuf) -> Self {
        self.name = name.into();
        self.directory = directory;
        self.repository = repository;
        self
    }

    /// Whether this actor is dispatched through the orchestration tool
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }
}

/// A named, typed channel slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDecl {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: TypeRef,
}

impl ChannelDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeRef::default(),
        }
    }
}

/// Reference to a channel schema type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_type_version")]
    pub version: String,
}

fn default_type_version() -> String {
    DEFAULT_TYPE_VERSION.to_string()
}

impl Default for TypeRef {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: default_type_version(),
        }
    }
}

/// How the actor is executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecuteSpec {
    pub executable: String,

    #[serde(default)]
    pub script_file: Option<String>,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Capture stdout as raw lines instead of a JSON document
    #[serde(default)]
    pub output_processor: Option<OutputProcessor>,
}

impl ExecuteSpec {
    /// The full command line: executable, script file, then arguments
    pub fn command_line(&self) -> Vec<String> {
        let mut command = vec![self.executable.clone()];
        command.extend(self.script_file.iter().cloned());
        command.extend(self.arguments.iter().cloned());
        command
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputProcessor {
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Channel path in marker form, e.g. `@result.lines@`
    pub target: String,
}

/// Remote execution target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSpec {
    #[serde(default = "default_remote_host")]
    pub host: String,

    #[serde(default = "default_remote_user")]
    pub user: String,
}

fn default_remote_host() -> String {
    DEFAULT_REMOTE_HOST.to_string()
}
fn default_remote_user() -> String {
    DEFAULT_REMOTE_USER.to_string()
}

impl Default for RemoteSpec {
    fn default() -> Self {
        Self {
            host: default_remote_host(),
            user: default_remote_user(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ACTOR_YAML: &str = r#"
description: Collects installed packages
tags:
  - inventory
  - packages
inputs:
  - name: filter
    type:
      name: PackageFilter
outputs:
  - name: packages
    type:
      name: PackageList
      version: "2"
execute:
  executable: /usr/bin/python3
  script-file: collect.py
  arguments:
    - --verbose
group:
  - os_facts
"#;

    #[test]
    fn test_definition_parsing() {
        let definition = Definition::from_yaml(TEST_ACTOR_YAML).unwrap();

        assert_eq!(definition.description, "Collects installed packages");
        assert!(definition.tags.contains("inventory"));
        assert_eq!(definition.inputs[0].kind.version, DEFAULT_TYPE_VERSION);
        assert_eq!(definition.outputs[0].kind.version, "2");
        assert_eq!(definition.group, vec!["os_facts".to_string()]);
        assert!(!definition.is_remote());

        let execute = definition.execute.unwrap();
        assert_eq!(
            execute.command_line(),
            vec!["/usr/bin/python3", "collect.py", "--verbose"]
        );
        assert!(execute.output_processor.is_none());
    }

    #[test]
    fn test_remote_defaults() {
        let yaml = r#"
execute:
  executable: uname
remote: {}
"#;
        let definition = Definition::from_yaml(yaml).unwrap();
        let remote = definition.remote.unwrap();
        assert_eq!(remote.host, "localhost");
        assert_eq!(remote.user, "root");
    }

    #[test]
    fn test_output_processor() {
        let yaml = r#"
execute:
  executable: ls
  arguments: ["-1"]
  output-processor:
    type: lines
    target: "@listing.entries@"
"#;
        let definition = Definition::from_yaml(yaml).unwrap();
        let processor = definition.execute.unwrap().output_processor.unwrap();
        assert_eq!(processor.kind, "lines");
        assert_eq!(processor.target, "@listing.entries@");
    }

    #[test]
    fn test_empty_definition() {
        let definition = Definition::from_yaml("{}").unwrap();
        assert!(definition.inputs.is_empty());
        assert!(definition.execute.is_none());
        assert!(definition.group.is_empty());
    }
}
