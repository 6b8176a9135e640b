//! envact - activate Python environments in shells

mod commands;
mod host;

use clap::{Parser, Subcommand};
use envact_config::{AutoActivationType, GlobalConfig};
use envact_host::ShellDialect;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "envact")]
#[command(author, version, about = "Shell environment activation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use default profile locations instead of asking the shells
    #[arg(long, global = true)]
    no_probe: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the activation command for a shell
    Command {
        /// Shell dialect (bash, zsh, sh, fish, nu, pwsh, powershell, cmd, gitbash)
        #[arg(short, long)]
        shell: ShellDialect,
        /// Environment descriptor (JSON file)
        #[arg(short, long, conflicts_with = "step")]
        env: Option<PathBuf>,
        /// A command step such as "conda activate myenv" (repeatable)
        #[arg(long)]
        step: Vec<String>,
        /// Print the deactivation command instead
        #[arg(long)]
        deactivate: bool,
        /// Print the command that runs the interpreter instead
        #[arg(long, conflicts_with = "deactivate")]
        run: bool,
    },

    /// Print the activation variables read by the shell startup hooks
    Env {
        /// Environment descriptor (JSON file)
        #[arg(short, long)]
        env: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which shells have the startup hook installed
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install the startup hook in shell profiles
    Setup {
        /// Only this shell (all installed shells if not specified)
        #[arg(short, long)]
        shell: Option<ShellDialect>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Remove the startup hook from shell profiles
    Teardown {
        /// Only this shell (all shells if not specified)
        #[arg(short, long)]
        shell: Option<ShellDialect>,
    },

    /// Show or edit global configuration
    Config {
        /// Open config in editor
        #[arg(short, long)]
        edit: bool,
        /// Set terminal.autoActivationType (off, command, shellStartup)
        #[arg(long)]
        set_mode: Option<AutoActivationType>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Load global config
    let mut config = GlobalConfig::load().unwrap_or_default();
    if cli.no_probe {
        config.startup.probe_profiles = false;
    }

    match cli.command {
        Commands::Command {
            shell,
            env,
            step,
            deactivate,
            run,
        } => {
            let kind = if deactivate {
                commands::CommandKind::Deactivate
            } else if run {
                commands::CommandKind::Run
            } else {
                commands::CommandKind::Activate
            };
            commands::command(shell, env.as_deref(), &step, kind)?;
        }
        Commands::Env { env, json } => {
            commands::env(&env, json)?;
        }
        Commands::Status { json } => {
            commands::status(config, json).await?;
        }
        Commands::Setup { shell, yes } => {
            commands::setup(config, shell, yes).await?;
        }
        Commands::Teardown { shell } => {
            commands::teardown(config, shell).await?;
        }
        Commands::Config { edit, set_mode } => {
            commands::config(edit, set_mode)?;
        }
    }

    Ok(())
}
