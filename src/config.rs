//! Configuration for snactor.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SNACTOR_ACTOR_PATH, SNACTOR_ANSIBLE)
//! 2. Config file (.snactor/config.yaml, then the user config directory)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .snactor/config.yaml
//! - Falls back to <config dir>/snactor/config.yaml
//! - Relative paths in a project config file are relative to the project root

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{RemoteSettings, DEFAULT_REMOTE_ROOT};

/// Actor repository used when nothing else is configured
pub const DEFAULT_ACTOR_PATH: &str = "/usr/share/snactor/actors";

/// Orchestration binary used when nothing else is configured
pub const DEFAULT_ANSIBLE_BINARY: &str = "ansible-playbook";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub actors: ActorsConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorsConfig {
    /// Actor repository directory
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    pub staging_root: Option<String>,
    pub playbook: Option<String>,
    pub sync_repo: Option<bool>,
    pub ansible_binary: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Actor repository to load the registry from
    pub actor_path: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Remote execution settings
    pub remote: RemoteSettings,
    /// Binary used to run playbooks
    pub ansible_binary: String,
}

impl ResolvedConfig {
    /// Playbook that will be used for actors loaded from `actor_path`
    pub fn playbook(&self) -> PathBuf {
        self.remote.playbook_for(&self.actor_path)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".snactor").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("snactor").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file with environment overrides
fn resolve(
    config: ConfigFile,
    config_path: Option<&Path>,
    env_actor_path: Option<String>,
    env_ansible: Option<String>,
) -> ResolvedConfig {
    // Base directory is the parent of .snactor/ (i.e., grandparent of config.yaml)
    let base_dir = config_path
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    let actor_path = match (env_actor_path, &config.actors.path) {
        (Some(env_path), _) => PathBuf::from(env_path),
        (None, Some(path)) => resolve_path(base_dir, path),
        (None, None) => PathBuf::from(DEFAULT_ACTOR_PATH),
    };

    let remote_config = config.remote.unwrap_or_default();
    let remote = RemoteSettings {
        staging_root: remote_config
            .staging_root
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REMOTE_ROOT)),
        playbook: remote_config
            .playbook
            .map(|playbook| resolve_path(base_dir, &playbook)),
        sync_repo: remote_config.sync_repo.unwrap_or(true),
    };

    let ansible_binary = env_ansible
        .or(remote_config.ansible_binary)
        .unwrap_or_else(|| DEFAULT_ANSIBLE_BINARY.to_string());

    ResolvedConfig {
        actor_path,
        config_file: config_path.map(Path::to_path_buf),
        remote,
        ansible_binary,
    }
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let config = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(
        config,
        config_file.as_deref(),
        std::env::var("SNACTOR_ACTOR_PATH").ok(),
        std::env::var("SNACTOR_ANSIBLE").ok(),
    ))
}
