//! Command line interface
//!
//! - `coco`: interactive session (default)
//! - `coco run [--agent <kind>] [--yes] <request>`: one turn, then exit
//! - `coco index`: rebuild the code index, then exit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coco_core::AgentKind;
use coco_llm::{AnthropicConfig, AnthropicProvider, LlmProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod commands;
pub mod confirm;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod setup;

/// coco command line
#[derive(Parser, Debug)]
#[command(name = "coco")]
#[command(about = "Terminal coding assistant for the repository you are in")]
#[command(version)]
pub struct Cli {
    /// Repository to work in (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Also print warnings and errors to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one request and exit
    Run {
        /// Agent to use instead of automatic routing (code, plan, ask, search)
        #[arg(long, value_parser = parse_agent)]
        agent: Option<AgentKind>,

        /// Approve every file write and command without asking
        #[arg(long)]
        yes: bool,

        /// The request
        #[arg(required = true, trailing_var_arg = true)]
        request: Vec<String>,
    },
    /// Rebuild the code index and exit
    Index,
}

fn parse_agent(s: &str) -> std::result::Result<AgentKind, String> {
    s.parse()
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    let root = resolve_root(cli.dir.as_deref())?;
    let config = crate::settings::load_config(&root)?;

    match cli.command {
        None => repl::run(&root, &config).await,
        Some(Commands::Run {
            agent,
            yes,
            request,
        }) => commands::run_once(&root, &config, agent, yes, &request.join(" ")).await,
        Some(Commands::Index) => commands::rebuild_index(&root, &config).await,
    }
}

fn resolve_root(dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Working directory {} not found", dir.display()))
}

/// The Anthropic provider, configured from the environment
pub fn provider(config: &coco_core::CocoConfig) -> Result<Arc<dyn LlmProvider>> {
    let settings = AnthropicConfig::from_env()
        .context("ANTHROPIC_API_KEY is not set. Export it or add it to a .env file.")?
        .with_model(&config.model.complex_model);
    let provider =
        AnthropicProvider::new(settings).context("Failed to create the Anthropic client")?;
    Ok(Arc::new(provider))
}
