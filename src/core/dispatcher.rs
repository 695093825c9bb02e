//! Actor execution.
//!
//! Runs a single actor either as a local subprocess or on a remote host
//! through the orchestration tool. Inputs are taken from the channel store
//! and outputs written back to it. Runtime failures are logged and reported
//! as `false`; the caller decides what to do with a failed run.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{AnsibleRunner, PlaybookInvocation, RemoteRunner, REMOTE_EXECUTE_PLAYBOOK};
use crate::domain::{Definition, ExecuteSpec};

use super::channels::{ChannelData, ChannelError, ChannelManager};
use super::shell::shell_join;

/// Where actor repositories are staged on remote hosts
pub const DEFAULT_REMOTE_ROOT: &str = "/tmp/actors";

/// Settings for the remote execution strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Repository location on the remote host
    pub staging_root: PathBuf,

    /// Playbook override; defaults to `<repository>/../playbooks/remote-execute-actor.yaml`
    pub playbook: Option<PathBuf>,

    /// Push the repository to the host before running
    pub sync_repo: bool,
}

impl RemoteSettings {
    /// Playbook used for actors loaded from `repository`
    pub fn playbook_for(&self, repository: &Path) -> PathBuf {
        match &self.playbook {
            Some(playbook) => playbook.clone(),
            None => normalize_path(
                &repository
                    .join("..")
                    .join("playbooks")
                    .join(REMOTE_EXECUTE_PLAYBOOK),
            ),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from(DEFAULT_REMOTE_ROOT),
            playbook: None,
            sync_repo: true,
        }
    }
}

/// Report written by the playbook into the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReport {
    pub rc: f64,
    pub stdout: String,
    pub stderr: String,
}

/// Executes actors against a channel store
pub struct Dispatcher {
    runner: Arc<dyn RemoteRunner>,
    remote: RemoteSettings,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher using `ansible-playbook` for remote actors
    pub fn new() -> Self {
        Self::with_runner(Arc::new(AnsibleRunner::new()), RemoteSettings::default())
    }

    pub fn with_runner(runner: Arc<dyn RemoteRunner>, remote: RemoteSettings) -> Self {
        Self { runner, remote }
    }

    pub fn remote_settings(&self) -> &RemoteSettings {
        &self.remote
    }

    /// Execute an actor, remotely when it declares a `remote` section
    pub async fn execute(&self, definition: &Definition, channels: &mut ChannelManager) -> bool {
        match &definition.remote {
            Some(remote) => {
                self.execute_remote(definition, channels, &remote.host, &remote.user)
                    .await
            }
            None => self.execute_local(definition, channels).await,
        }
    }

    /// Execute an actor as a local subprocess
    #[instrument(skip(self, definition, channels), fields(actor = %definition.name))]
    pub async fn execute_local(&self, definition: &Definition, channels: &mut ChannelManager) -> bool {
        let Some(execute) = &definition.execute else {
            error!("Actor has no execute section");
            return false;
        };

        let payload = match encode_inputs(definition, channels) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to collect actor inputs");
                return false;
            }
        };

        let command = execute.command_line();
        let mut cmd = Command::new(&command[0]);
        cmd.args(&command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !definition.directory.as_os_str().is_empty() {
            cmd.current_dir(&definition.directory);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(executable = %execute.executable, error = %e, "Failed to spawn actor process");
                return false;
            }
        };

        // Feed stdin while waiting so a chatty child can't fill its stdout pipe and stall us
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        if let Err(e) = fed {
            debug!(error = %e, "Actor did not consume all of its input");
        }

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to wait for actor process");
                return false;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        handle_output(definition, execute, channels, &stdout, &stderr);

        let success = output.status.success();
        if success {
            info!("Actor completed");
        } else {
            warn!(exit_code = output.status.code().unwrap_or(-1), "Actor failed");
        }
        success
    }

    /// Execute an actor on `host` through the orchestration tool
    #[instrument(skip(self, definition, channels), fields(actor = %definition.name, runner = self.runner.name()))]
    pub async fn execute_remote(
        &self,
        definition: &Definition,
        channels: &mut ChannelManager,
        host: &str,
        user: &str,
    ) -> bool {
        match self.try_execute_remote(definition, channels, host, user).await {
            Ok(success) => success,
            Err(e) => {
                error!(error = %e, "Remote execution failed");
                false
            }
        }
    }

    async fn try_execute_remote(
        &self,
        definition: &Definition,
        channels: &mut ChannelManager,
        host: &str,
        user: &str,
    ) -> Result<bool> {
        let execute = definition
            .execute
            .as_ref()
            .context("Actor has no execute section")?;

        // Both files are removed when the guards drop, on every return path
        let input_file = NamedTempFile::new().context("Failed to create actor input file")?;
        let output_file = NamedTempFile::new().context("Failed to create actor output file")?;

        let invocation = PlaybookInvocation {
            host: host.to_string(),
            user: user.to_string(),
            playbook: self.remote.playbook_for(&definition.repository),
            actor_repository: definition.repository.clone(),
            remote_repo_root: self.remote.staging_root.clone(),
            sync_repo: self.remote.sync_repo,
            actor_command: shell_join(execute.command_line()),
            actor_name: definition.name.clone(),
            actor_cwd: self.remote_working_dir(definition),
            input_file: input_file.path().to_path_buf(),
            output_file: output_file.path().to_path_buf(),
        };

        let payload = encode_inputs(definition, channels)?;
        tokio::fs::write(input_file.path(), &payload)
            .await
            .context("Failed to write actor input file")?;

        info!(%host, %user, cwd = %invocation.actor_cwd.display(), "Running actor remotely");
        let exited_ok = self.runner.run(&invocation).await?;

        let report_ok =
            handle_remote_report(definition, execute, channels, output_file.path()).await;

        if !exited_ok {
            warn!("Orchestration tool exited with failure");
        }
        Ok(exited_ok && report_ok)
    }

    /// Actor directory rebased from the local repository onto the staging root
    pub fn remote_working_dir(&self, definition: &Definition) -> PathBuf {
        let relative = match definition.directory.strip_prefix(&definition.repository) {
            Ok(relative) if relative.is_relative() => relative,
            _ => Path::new(&definition.name),
        };
        normalize_path(&self.remote.staging_root.join(relative))
    }
}

/// Read the playbook's report and feed it through output handling.
///
/// A missing or malformed report is a failed run, not an error.
async fn handle_remote_report(
    definition: &Definition,
    execute: &ExecuteSpec,
    channels: &mut ChannelManager,
    path: &Path,
) -> bool {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "Failed to read remote report");
            return false;
        }
    };

    let report: RemoteReport = match serde_json::from_str(&content) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Malformed remote report");
            return false;
        }
    };

    info!(report = %serde_json::to_string(&report).unwrap_or_default(), "Remote report");

    handle_output(definition, execute, channels, &report.stdout, &report.stderr);
    report.rc == 0.0
}

fn handle_output(
    definition: &Definition,
    execute: &ExecuteSpec,
    channels: &mut ChannelManager,
    stdout: &str,
    stderr: &str,
) {
    if let Err(e) = handle_stdout(definition, execute, channels, stdout) {
        warn!(error = %e, "Failed to assign actor output");
    }
    handle_stderr(stderr);
}

fn encode_inputs(definition: &Definition, channels: &ChannelManager) -> Result<Vec<u8>> {
    let inputs = channels.get_filtered(&definition.inputs)?;
    let mut payload = serde_json::to_vec(&inputs).context("Failed to encode actor inputs")?;
    payload.push(b'\n');
    Ok(payload)
}

fn handle_stdout(
    definition: &Definition,
    execute: &ExecuteSpec,
    channels: &mut ChannelManager,
    stdout: &str,
) -> Result<(), ChannelError> {
    if let Some(processor) = &execute.output_processor {
        let lines = stdout.lines().map(|line| Value::String(line.to_string())).collect();
        return channels.assign_to_variable(&processor.target, Value::Array(lines));
    }

    // Undecodable output counts as no output; declared channels then show up as missing
    let output: ChannelData = serde_json::from_str(stdout).unwrap_or_else(|e| {
        debug!(error = %e, "Actor output is not a JSON mapping");
        ChannelData::new()
    });
    channels.assign_filtered(&definition.outputs, &output)
}

/// Stderr is captured but not interpreted yet
fn handle_stderr(_stderr: &str) {}

/// Lexically resolve `.` and `..` components
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_name = matches!(normalized.components().next_back(), Some(Component::Normal(_)));
                if ends_in_name {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
