//! Cuttlefish
//!
//! Routed retrieval-augmented answers over an issue-tracker corpus.
//!
//! # Usage
//!
//! ```bash
//! cuttlefish serve [--host HOST] [--port PORT]
//! cuttlefish route "query" [--can-wait] [--incident]
//! cuttlefish sanity [--endpoint URL] [--openai-key KEY]
//! cuttlefish inspect [--limit N]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/cuttlefish/config.toml)
//! 3. Environment variables (CUTTLEFISH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use cuttlefish_daemon::{route, run_inspect, run_sanity, serve, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            serve(
                cli.config.as_deref(),
                host.as_deref(),
                port,
                cli.log_level.as_deref(),
            )
            .await?;
        }
        Commands::Route {
            query,
            can_wait,
            incident,
        } => {
            route(&query, can_wait, incident)?;
        }
        Commands::Sanity {
            endpoint,
            openai_key,
        } => {
            run_sanity(&endpoint, openai_key).await?;
        }
        Commands::Inspect { limit } => {
            run_inspect(cli.config.as_deref(), limit).await?;
        }
    }

    Ok(())
}
