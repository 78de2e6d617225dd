use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "assetd",
    about = "Asset storage server with deduplicating backends",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Validate a configuration and print the effective settings
    CheckConfig(ConfigArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Workspace directory holding every storage root (overrides the file)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,
    /// Listen address (overrides the file)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
    /// Storage type used when "default" is requested: memory, filesystem or hashed
    #[arg(long)]
    pub default_type: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
