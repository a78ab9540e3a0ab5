use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use users_admin::contract::client::UsersRemote;
use users_admin::infra::{HttpUsersRemote, InMemoryUsersRemote};
use users_admin::{UsersAdminConfig, UsersSession};

mod shell;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "users_admin";

/// Users Admin - browse and edit a remote user directory
#[derive(Parser)]
#[command(name = "users-admin")]
#[command(about = "Users Admin - browse and edit a remote user directory")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the users service (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory users service instead of HTTP
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Shell,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let mut module_config: UsersAdminConfig = config.module_config(MODULE_NAME)?;
    if let Some(base_url) = cli.base_url {
        module_config.base_url = base_url;
    }
    // Keep the bag in sync so --print-config shows what will be used
    config.modules.insert(
        MODULE_NAME.to_string(),
        serde_json::to_value(&module_config).context("Failed to serialize module config")?,
    );

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.home_dir));
    tracing::info!("Users Admin starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(module_config, args).await,
        Commands::Check => check_config(config, module_config),
    }
}

async fn run_shell(module_config: UsersAdminConfig, args: CliArgs) -> Result<()> {
    let remote: Arc<dyn UsersRemote> = if args.mock {
        tracing::info!("Using in-memory users service");
        Arc::new(InMemoryUsersRemote::seeded())
    } else {
        tracing::info!(base_url = %module_config.base_url, "Using HTTP users service");
        Arc::new(
            HttpUsersRemote::from_base_url(&module_config.base_url)
                .context("Failed to build users client")?,
        )
    };

    let session = Arc::new(UsersSession::new(remote, &module_config));
    shell::Shell::new(session).run().await
}

fn check_config(config: AppConfig, module_config: UsersAdminConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if !module_config.page_size_options.contains(&module_config.page_size) {
        anyhow::bail!(
            "page_size {} is not one of page_size_options {:?}",
            module_config.page_size,
            module_config.page_size_options
        );
    }
    HttpUsersRemote::from_base_url(&module_config.base_url).context("Invalid base_url")?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
