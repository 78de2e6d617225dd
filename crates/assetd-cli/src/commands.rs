use anyhow::{bail, Context};
use assetd_server::{AssetServer, ServerConfig};
use assetd_types::StorageType;
use colored::Colorize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

/// Load the configuration file (if any) and apply command-line overrides.
fn build_config(args: &ConfigArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(workspace) = &args.workspace {
        config.storage = config.storage.with_workspace(workspace);
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(name) = &args.default_type {
        let storage_type: StorageType = name.parse().unwrap_or_default();
        if storage_type == StorageType::Default {
            bail!("unknown default storage type {name:?}; expected memory, filesystem or hashed");
        }
        config.storage.default_storage_type = storage_type;
    }

    config.storage.validate()?;
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = build_config(&args.config)?;
    tracing::info!(
        bind = %config.bind_addr,
        registry = %config.storage.registry_file.display(),
        "starting assetd"
    );

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let server = AssetServer::new(config)?;
        server.serve().await
    })?;
    Ok(())
}

fn cmd_check_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    println!("{} Configuration is valid.", "✓".green().bold());
    println!("  Listen: {}", config.bind_addr.to_string().bold());
    println!("  Default storage: {}", config.storage.default_storage_type.to_string().yellow());
    println!();
    print!("{}", toml::to_string_pretty(&config).context("rendering configuration")?);
    Ok(())
}
