//! Global configuration for envact
//!
//! Located at `~/.config/envact/config.toml`

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How terminals get their environment activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AutoActivationType {
    /// Never activate
    Off,
    /// Send activation commands into the terminal after it opens
    #[default]
    Command,
    /// Let a hook in the shell's startup profile evaluate an env variable
    ShellStartup,
}

impl std::fmt::Display for AutoActivationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Command => write!(f, "command"),
            Self::ShellStartup => write!(f, "shellStartup"),
        }
    }
}

impl std::str::FromStr for AutoActivationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "command" => Ok(Self::Command),
            "shellstartup" | "shell-startup" => Ok(Self::ShellStartup),
            _ => Err(format!("Unknown activation type: {}", s)),
        }
    }
}

/// Global envact configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub terminal: TerminalConfig,
    pub startup: StartupConfig,
}

/// Terminal activation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerminalConfig {
    /// Preferred activation mechanism
    pub auto_activation_type: AutoActivationType,
    /// Master switch; `false` behaves like `autoActivationType = "off"`
    pub activate_environment: bool,
    /// How long to wait for shell integration before falling back to
    /// sending raw text into the terminal
    pub shell_integration_timeout_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            auto_activation_type: AutoActivationType::Command,
            activate_environment: true,
            shell_integration_timeout_ms: 500,
        }
    }
}

/// Shell startup script settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartupConfig {
    /// Ask the shells themselves for their profile paths (spawns them)
    pub probe_profiles: bool,
    /// Directory holding the cmd.exe startup batch files
    pub cmd_scripts_dir: Option<String>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            probe_profiles: true,
            cmd_scripts_dir: None,
        }
    }
}

impl StartupConfig {
    /// The configured cmd scripts directory with `~` expanded
    pub fn cmd_scripts_dir(&self) -> Option<PathBuf> {
        self.cmd_scripts_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
    }
}

impl GlobalConfig {
    /// Load global configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(
            "Loaded config from {:?}: autoActivationType={}",
            path,
            config.terminal.auto_activation_type
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "envact").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The activation mode after applying the `activateEnvironment` switch
    pub fn effective_activation_type(&self) -> AutoActivationType {
        if self.terminal.activate_environment {
            self.terminal.auto_activation_type
        } else {
            AutoActivationType::Off
        }
    }
}
