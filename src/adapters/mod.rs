//! Adapter interfaces for external systems.
//!
//! Remote actors are run through an orchestration tool; the dispatcher
//! only depends on the `RemoteRunner` trait so the tool can be swapped.

pub mod ansible;

use anyhow::Result;
use async_trait::async_trait;

pub use ansible::{AnsibleRunner, PlaybookInvocation, REMOTE_EXECUTE_PLAYBOOK};

/// Trait for orchestration tools that run an actor on a remote host
#[async_trait]
pub trait RemoteRunner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Run the playbook, returning whether the tool itself exited successfully.
    ///
    /// The actor's own result is written to `invocation.output_file`.
    async fn run(&self, invocation: &PlaybookInvocation) -> Result<bool>;
}
