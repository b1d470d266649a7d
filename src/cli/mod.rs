//! CLI module for devrun
//!
//! Provides commands:
//! - `serve`: Run the supervisor and its HTTP/WebSocket API (default)
//! - `check`: Validate configuration and print the service catalog

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod check;

/// Local development service supervisor
#[derive(Parser, Debug)]
#[command(name = "devrun")]
#[command(about = "Supervise local development services")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve(ServeArgs),
    /// Validate configuration and list services
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind
    #[arg(long, short)]
    pub port: Option<u16>,
    /// Extra configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Extra configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Check(args)) => check::run(args.config.as_deref()),
        Some(Commands::Serve(args)) => serve(args).await,
        None => serve(ServeArgs::default()).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    crate::server::run(crate::server::ServeOptions {
        host: args.host,
        port: args.port,
        config: args.config,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["devrun", "serve", "--port", "4400", "--host", "0.0.0.0"]);
        match cli.command {
            Some(Commands::Serve(args)) => {
                assert_eq!(args.port, Some(4400));
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        assert!(Cli::parse_from(["devrun"]).command.is_none());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
