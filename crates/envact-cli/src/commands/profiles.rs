//! Commands that inspect and edit shell startup scripts

use crate::host::{ConfirmPrompt, DetachedHost, FixedResolver};
use anyhow::{bail, Context, Result};
use envact_config::{AutoActivationType, GlobalConfig};
use envact_core::startup::{ShellScriptEditState, ShellStartupScriptProvider};
use envact_core::TerminalManager;
use envact_host::ShellDialect;
use std::sync::Arc;

fn manager(config: GlobalConfig, assume_yes: bool) -> Result<Arc<TerminalManager>> {
    let manager = TerminalManager::from_env(
        Arc::new(DetachedHost::default()),
        Arc::new(FixedResolver(None)),
        Arc::new(ConfirmPrompt { assume_yes }),
        config,
    )?;
    Ok(manager)
}

fn provider_for(
    manager: &TerminalManager,
    shell: ShellDialect,
) -> Result<Arc<dyn ShellStartupScriptProvider>> {
    match manager.startup_providers().for_dialect(shell) {
        Some(provider) => Ok(provider),
        None => bail!("No startup script support for {} on this platform", shell),
    }
}

/// Show the startup hook state of every shell
pub async fn status(config: GlobalConfig, json: bool) -> Result<()> {
    let manager = manager(config, false)?;
    let statuses = manager.setup_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("{:<6} {:<14} {:<22} PROFILES", "SHELL", "STATE", "VARIABLE");
    for status in &statuses {
        let profiles: Vec<String> = status
            .profiles
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        println!(
            "{:<6} {:<14} {:<22} {}",
            status.shell,
            status.state.to_string(),
            status.env_key,
            profiles.join(", ")
        );
    }
    Ok(())
}

/// Install the startup hook, asking first unless `yes`
pub async fn setup(config: GlobalConfig, shell: Option<ShellDialect>, yes: bool) -> Result<()> {
    let manager = manager(config, yes)?;
    let dialects: Vec<ShellDialect> = match shell {
        Some(shell) => {
            provider_for(&manager, shell)?;
            vec![shell]
        }
        None => manager
            .startup_providers()
            .all()
            .iter()
            .filter_map(|p| p.dialects().first().copied())
            .collect(),
    };

    let edits = manager.handle_setup_check(&dialects).await;
    if edits.is_empty() {
        println!("No startup scripts were changed");
    }

    let mut failed = Vec::new();
    for (name, state) in &edits {
        println!("{}: {}", name, state);
        if *state == ShellScriptEditState::NotEdited {
            failed.push(*name);
        }
    }
    if !failed.is_empty() {
        bail!("Failed to set up {}", failed.join(", "));
    }
    Ok(())
}

/// Remove the startup hook from one shell or from all of them
pub async fn teardown(config: GlobalConfig, shell: Option<ShellDialect>) -> Result<()> {
    let manager = manager(config, false)?;
    let results = match shell {
        Some(shell) => {
            let provider = provider_for(&manager, shell)?;
            vec![(provider.name(), provider.teardown_scripts().await)]
        }
        None => manager.revert_startup_scripts().await,
    };

    let mut failed = Vec::new();
    for (name, state) in &results {
        println!("{}: {}", name, state);
        if *state == ShellScriptEditState::NotEdited {
            failed.push(*name);
        }
    }
    if !failed.is_empty() {
        bail!("Failed to tear down {}", failed.join(", "));
    }
    Ok(())
}

/// Show or edit the configuration file
pub fn config(edit: bool, set_mode: Option<AutoActivationType>) -> Result<()> {
    let config_path = GlobalConfig::config_path()?;

    if let Some(mode) = set_mode {
        let mut config = GlobalConfig::load_from(&config_path)?;
        config.terminal.auto_activation_type = mode;
        config.save_to(&config_path)?;
        println!("autoActivationType set to {}", mode);
        return Ok(());
    }

    if edit {
        // Open in editor
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

        // Create config file with defaults if it doesn't exist
        if !config_path.exists() {
            GlobalConfig::default().save_to(&config_path)?;
            println!("Created default config at {:?}", config_path);
        }

        std::process::Command::new(&editor)
            .arg(&config_path)
            .status()
            .context(format!("Failed to open editor: {}", editor))?;
    } else if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("# Config file: {:?}\n", config_path);
        println!("{}", content);
    } else {
        println!("# Config file: {:?} (not created yet)\n", config_path);
        println!("# Default configuration:");
        let content = toml::to_string_pretty(&GlobalConfig::default())?;
        println!("{}", content);
        println!("\n# Run 'envact config --edit' to create and edit the config file.");
    }

    Ok(())
}
