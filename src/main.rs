use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mfnav::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for mfnav::AppCommand {
    fn from(cmd: Commands) -> mfnav::AppCommand {
        match cmd {
            Commands::Search { query } => mfnav::AppCommand::Search { query },
            Commands::Info { scheme_code } => mfnav::AppCommand::Info { scheme_code },
            Commands::Nav { scheme_code } => mfnav::AppCommand::Nav { scheme_code },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fuzzy-search the fund directory
    Search { query: String },
    /// Show the descriptor for a scheme code
    Info { scheme_code: u32 },
    /// Show the NAV history for a scheme code
    Nav { scheme_code: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => mfnav::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = mfnav::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
provider:
  base_url: "https://api.mfapi.in/mf"
  timeout_secs: 10

refresh:
  directory_interval_secs: 2592000
  series_interval_secs: 86400

corrections: []
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
