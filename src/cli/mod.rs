//! Command-line interface for snactor.
//!
//! Provides commands for running a single actor, listing the actors in a
//! repository and showing the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::AnsibleRunner;
use crate::config::{load_config, ResolvedConfig};
use crate::core::{ChannelData, ChannelManager, Dispatcher, Registry};

/// snactor - run actors locally or on remote hosts
#[derive(Parser, Debug)]
#[command(name = "snactor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single actor
    Run {
        /// Actor name
        actor_name: String,

        /// Actor repository (overrides configuration)
        #[arg(long, env = "SNACTOR_ACTOR_PATH")]
        actor_path: Option<PathBuf>,

        /// JSON file with initial channel data
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Run on this host even if the actor has no remote section
        #[arg(long)]
        remote_host: Option<String>,

        /// User for --remote-host
        #[arg(long, default_value = "root")]
        remote_user: String,

        /// Don't push the actor repository to the remote host
        #[arg(long)]
        no_sync: bool,
    },

    /// List actors in the repository
    List {
        /// Actor repository (overrides configuration)
        #[arg(long, env = "SNACTOR_ACTOR_PATH")]
        actor_path: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config {
        /// Actor repository (overrides configuration)
        #[arg(long, env = "SNACTOR_ACTOR_PATH")]
        actor_path: Option<PathBuf>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = load_config()?;

        match self.command {
            Commands::Run {
                actor_name,
                actor_path,
                data,
                remote_host,
                remote_user,
                no_sync,
            } => {
                let actor_path = actor_path.unwrap_or_else(|| config.actor_path.clone());
                let options = RunOptions {
                    actor_path,
                    data,
                    remote_host,
                    remote_user,
                    no_sync,
                };
                run_actor(&config, &actor_name, options).await
            }
            Commands::List { actor_path } => {
                let actor_path = actor_path.unwrap_or_else(|| config.actor_path.clone());
                list_actors(&actor_path)
            }
            Commands::Config { actor_path } => {
                if let Some(actor_path) = actor_path {
                    config.actor_path = actor_path;
                }
                show_config(&config);
                Ok(())
            }
        }
    }
}

struct RunOptions {
    actor_path: PathBuf,
    data: Option<PathBuf>,
    remote_host: Option<String>,
    remote_user: String,
    no_sync: bool,
}

async fn run_actor(config: &ResolvedConfig, actor_name: &str, options: RunOptions) -> Result<()> {
    let registry = Registry::load(&options.actor_path)
        .with_context(|| format!("Failed to load actors from {}", options.actor_path.display()))?;

    let definition = registry
        .get(actor_name)
        .with_context(|| format!("Actor '{}' not found in {}", actor_name, registry.root().display()))?;

    let mut channels = match &options.data {
        Some(path) => ChannelManager::with_data(load_channel_data(path)?),
        None => ChannelManager::new(),
    };

    let mut remote = config.remote.clone();
    if options.no_sync {
        remote.sync_repo = false;
    }
    let runner = Arc::new(AnsibleRunner::with_binary_path(&config.ansible_binary));
    let dispatcher = Dispatcher::with_runner(runner, remote);

    info!(actor = %definition.name, directory = %definition.directory.display(), "Dispatching actor");

    let success = match &options.remote_host {
        Some(host) => {
            dispatcher
                .execute_remote(definition, &mut channels, host, &options.remote_user)
                .await
        }
        None => dispatcher.execute(definition, &mut channels).await,
    };

    println!(
        "Execution of actor {} ({}) result {}",
        definition.name,
        definition.directory.display(),
        success
    );
    println!("{}", serde_json::to_string_pretty(channels.data())?);

    if !success {
        anyhow::bail!("Actor '{}' failed", definition.name);
    }
    Ok(())
}

fn load_channel_data(path: &Path) -> Result<ChannelData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read channel data: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Channel data must be a JSON object: {}", path.display()))
}

fn list_actors(actor_path: &Path) -> Result<()> {
    let registry = Registry::load(actor_path)
        .with_context(|| format!("Failed to load actors from {}", actor_path.display()))?;

    if registry.is_empty() {
        println!("No actors found in {}", actor_path.display());
        return Ok(());
    }

    println!("{:<30} {:<8} DESCRIPTION", "NAME", "MODE");
    println!("{}", "-".repeat(70));

    for definition in registry.definitions() {
        let mode = if definition.is_remote() { "remote" } else { "local" };
        println!("{:<30} {:<8} {}", definition.name, mode, definition.description);
    }

    println!();
    println!("Total: {} actors", registry.len());
    Ok(())
}

fn show_config(config: &ResolvedConfig) {
    println!("snactor configuration");
    println!("=====================");
    println!();

    match &config.config_file {
        Some(path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none, using defaults)"),
    }

    println!("Actor path:    {}", config.actor_path.display());
    println!("Playbook:      {}", config.playbook().display());
    println!("Staging root:  {}", config.remote.staging_root.display());
    println!("Sync repo:     {}", config.remote.sync_repo);
    println!("Ansible:       {}", config.ansible_binary);
}
