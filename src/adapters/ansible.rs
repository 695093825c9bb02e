//! Ansible adapter for remote actor execution.
//!
//! Runs `ansible-playbook` against a single host. The playbook copies the
//! actor repository to the host when asked to, runs the actor command with
//! the input file on stdin and writes `{rc, stdout, stderr}` into the
//! output file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use super::RemoteRunner;

/// Playbook file name, relative to the playbooks directory
pub const REMOTE_EXECUTE_PLAYBOOK: &str = "remote-execute-actor.yaml";

/// Everything the playbook needs to run one actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookInvocation {
    pub host: String,
    pub user: String,
    pub playbook: PathBuf,
    /// Local definition repository
    pub actor_repository: PathBuf,
    /// Where the repository lives on the remote host
    pub remote_repo_root: PathBuf,
    /// Push a fresh copy of the repository before running
    pub sync_repo: bool,
    /// Shell-quoted command line
    pub actor_command: String,
    pub actor_name: String,
    pub actor_cwd: PathBuf,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
}

/// Extra variables handed to the playbook as one JSON document
#[derive(Serialize)]
struct ExtraVars<'a> {
    actor_repository: &'a Path,
    sync_repo: bool,
    remote_host: &'a str,
    actor_output_file: &'a Path,
    actor_input_file: &'a Path,
    actor_command: &'a str,
    actor_name: &'a str,
    actor_cwd: &'a Path,
    actor_remote_repo_path: &'a Path,
}

impl PlaybookInvocation {
    /// Render the `ansible-playbook` arguments
    pub fn to_args(&self) -> Result<Vec<String>> {
        let extra_vars = ExtraVars {
            actor_repository: &self.actor_repository,
            sync_repo: self.sync_repo,
            remote_host: &self.host,
            actor_output_file: &self.output_file,
            actor_input_file: &self.input_file,
            actor_command: &self.actor_command,
            actor_name: &self.actor_name,
            actor_cwd: &self.actor_cwd,
            actor_remote_repo_path: &self.remote_repo_root,
        };
        let extra_vars =
            serde_json::to_string(&extra_vars).context("Failed to serialize playbook variables")?;

        Ok(vec![
            self.playbook.to_string_lossy().into_owned(),
            "-i".to_string(),
            // trailing comma makes ansible treat it as a host list, not an inventory file
            format!("{},", self.host),
            "-u".to_string(),
            self.user.clone(),
            "-e".to_string(),
            extra_vars,
        ])
    }
}

/// Runs playbooks through the `ansible-playbook` binary
pub struct AnsibleRunner {
    binary_path: String,
}

impl Default for AnsibleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsibleRunner {
    pub fn new() -> Self {
        Self::with_binary_path("ansible-playbook")
    }

    /// Create a runner with a custom binary path
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl RemoteRunner for AnsibleRunner {
    fn name(&self) -> &str {
        "ansible"
    }

    async fn run(&self, invocation: &PlaybookInvocation) -> Result<bool> {
        let args = invocation.to_args()?;

        let output = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run {} for actor '{}'",
                    self.binary_path, invocation.actor_name
                )
            })?;

        debug!(
            actor = %invocation.actor_name,
            exit_code = output.status.code().unwrap_or(-1),
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Playbook finished"
        );

        Ok(output.status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> PlaybookInvocation {
        PlaybookInvocation {
            host: "10.0.0.5".to_string(),
            user: "deploy".to_string(),
            playbook: PathBuf::from("/srv/playbooks/remote-execute-actor.yaml"),
            actor_repository: PathBuf::from("/srv/actors"),
            remote_repo_root: PathBuf::from("/tmp/actors"),
            sync_repo: true,
            actor_command: "python3 run.py 'a b'".to_string(),
            actor_name: "facts".to_string(),
            actor_cwd: PathBuf::from("/tmp/actors/system/facts"),
            input_file: PathBuf::from("/tmp/in.json"),
            output_file: PathBuf::from("/tmp/out.json"),
        }
    }

    #[test]
    fn test_runner_creation() {
        let runner = AnsibleRunner::new();
        assert_eq!(runner.name(), "ansible");
        assert_eq!(runner.binary_path, "ansible-playbook");
    }

    #[test]
    fn test_args_layout() {
        let args = invocation().to_args().unwrap();
        assert_eq!(&args[..6], &[
            "/srv/playbooks/remote-execute-actor.yaml",
            "-i",
            "10.0.0.5,",
            "-u",
            "deploy",
            "-e",
        ]);

        let vars: serde_json::Value = serde_json::from_str(&args[6]).unwrap();
        assert_eq!(vars["actor_command"], "python3 run.py 'a b'");
        assert_eq!(vars["sync_repo"], true);
        assert_eq!(vars["remote_host"], "10.0.0.5");
        assert_eq!(vars["actor_cwd"], "/tmp/actors/system/facts");
        assert_eq!(vars["actor_remote_repo_path"], "/tmp/actors");
        assert_eq!(vars["actor_input_file"], "/tmp/in.json");
        assert_eq!(vars["actor_output_file"], "/tmp/out.json");
    }
}
