//! snactor - actor dispatcher
//!
//! Runs declaratively defined units of work ("actors") either as local
//! processes or on remote hosts through Ansible, wiring their inputs and
//! outputs through a shared channel store.
//!
//! # Modules
//!
//! - `adapters`: External orchestration tools (Ansible)
//! - `core`: Channels, Registry, Dispatcher, shell quoting
//! - `domain`: Actor definitions
//! - `config`: Path and remote execution settings
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run an actor with pre-seeded channel data
//! snactor run os_facts --data seed.json
//!
//! # List the actors in a repository
//! snactor list --actor-path ./actors
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{ChannelError, ChannelManager, Dispatcher, Registry, RegistryError};
pub use crate::domain::Definition;
