//! CLI argument parsing for the cuttlefish binary.
//!
//! CLI flags override every other config source.

use clap::{Parser, Subcommand};

/// Cuttlefish
///
/// Routed retrieval-augmented answers over an issue-tracker corpus.
#[derive(Parser, Debug)]
#[command(name = "cuttlefish")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/cuttlefish/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override listen host
        #[arg(long)]
        host: Option<String>,

        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the routing decision for a query (no network)
    Route {
        /// Query text
        query: String,

        /// The user is willing to wait for a broader search
        #[arg(long)]
        can_wait: bool,

        /// The query concerns a production incident
        #[arg(long)]
        incident: bool,
    },

    /// Check a running server against the three routing scenarios
    Sanity {
        /// Server base URL
        #[arg(short, long, default_value = "http://127.0.0.1:5020")]
        endpoint: String,

        /// Provider key sent with each request (defaults to $OPENAI_API_KEY)
        #[arg(long)]
        openai_key: Option<String>,
    },

    /// Show the configured Qdrant collection and its payload fields
    Inspect {
        /// Number of points to sample
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve_defaults() {
        let cli = Cli::parse_from(["cuttlefish", "serve"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert!(host.is_none());
                assert!(port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_with_overrides() {
        let cli = Cli::parse_from(["cuttlefish", "serve", "--host", "127.0.0.1", "-p", "8080"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(8080));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_route_flags() {
        let cli = Cli::parse_from([
            "cuttlefish",
            "route",
            "Production system down",
            "--incident",
            "--can-wait",
        ]);
        match cli.command {
            Commands::Route {
                query,
                can_wait,
                incident,
            } => {
                assert_eq!(query, "Production system down");
                assert!(can_wait);
                assert!(incident);
            }
            _ => panic!("Expected Route command"),
        }
    }

    #[test]
    fn test_cli_sanity_endpoint() {
        let cli = Cli::parse_from(["cuttlefish", "sanity", "-e", "http://localhost:9999"]);
        match cli.command {
            Commands::Sanity { endpoint, .. } => assert_eq!(endpoint, "http://localhost:9999"),
            _ => panic!("Expected Sanity command"),
        }
    }

    #[test]
    fn test_cli_inspect_limit() {
        let cli = Cli::parse_from(["cuttlefish", "inspect"]);
        match cli.command {
            Commands::Inspect { limit } => assert_eq!(limit, 5),
            _ => panic!("Expected Inspect command"),
        }

        let cli = Cli::parse_from(["cuttlefish", "--config", "c.toml", "inspect", "-n", "20"]);
        assert_eq!(cli.config.as_deref(), Some("c.toml"));
        match cli.command {
            Commands::Inspect { limit } => assert_eq!(limit, 20),
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "cuttlefish",
            "--config",
            "/etc/cuttlefish.toml",
            "--log-level",
            "debug",
            "serve",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/etc/cuttlefish.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
