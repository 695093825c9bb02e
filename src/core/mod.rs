//! Core dispatch logic.
//!
//! This module contains:
//! - Channels: the data store shared by actors
//! - Registry: actor discovery and dependency checks
//! - Dispatcher: local and remote execution
//! - Shell: quoting for remote command lines

pub mod channels;
pub mod dispatcher;
pub mod registry;
pub mod shell;

// Re-export commonly used types
pub use channels::{ChannelData, ChannelError, ChannelManager};
pub use dispatcher::{Dispatcher, RemoteReport, RemoteSettings, DEFAULT_REMOTE_ROOT};
pub use registry::{Registry, RegistryError, DEFINITION_FILE};
pub use shell::{shell_join, shell_quote};
