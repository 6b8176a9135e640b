//! Common types shared between the host and the activation core

use crate::{HostError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvironmentId(pub String);

impl EnvironmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EnvironmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Terminal ID wrapper, assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerminalId(pub u64);

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One program invocation inside an activation sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandStep {
    pub fn new<I, S>(executable: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Shell command syntax family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellDialect {
    Bash,
    Zsh,
    Sh,
    Fish,
    Nu,
    Pwsh,
    #[serde(rename = "powershell")]
    PowerShellClassic,
    Cmd,
    #[serde(rename = "gitbash")]
    GitBash,
    /// Shell could not be identified; also the fallback key in command maps
    Unknown,
}

impl ShellDialect {
    /// Every identifiable dialect (excludes `Unknown`)
    pub const ALL: [ShellDialect; 9] = [
        Self::Bash,
        Self::Zsh,
        Self::Sh,
        Self::Fish,
        Self::Nu,
        Self::Pwsh,
        Self::PowerShellClassic,
        Self::Cmd,
        Self::GitBash,
    ];

    /// Separator placed between chained commands
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Pwsh | Self::PowerShellClassic | Self::Nu => ";",
            Self::Fish => "; and",
            _ => "&&",
        }
    }

    /// Whether a leading space keeps the line out of the shell history
    pub fn hides_history_with_leading_space(&self) -> bool {
        matches!(self, Self::Bash | Self::Zsh | Self::GitBash)
    }

    pub fn is_powershell(&self) -> bool {
        matches!(self, Self::Pwsh | Self::PowerShellClassic)
    }

    /// Identify a dialect from a shell executable path or bare name.
    ///
    /// `bash` living under a Git for Windows install is reported as
    /// [`ShellDialect::GitBash`].
    pub fn from_shell_path(shell: &str) -> Self {
        let normalized = shell.replace('\\', "/").to_lowercase();
        let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
        let stem = file_name.strip_suffix(".exe").unwrap_or(file_name);

        match stem {
            "bash" if normalized.contains("/git/") => Self::GitBash,
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "sh" | "dash" | "ash" => Self::Sh,
            "fish" => Self::Fish,
            "nu" => Self::Nu,
            "pwsh" | "pwsh-preview" => Self::Pwsh,
            "powershell" => Self::PowerShellClassic,
            "cmd" => Self::Cmd,
            "gitbash" | "git-bash" => Self::GitBash,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bash => write!(f, "bash"),
            Self::Zsh => write!(f, "zsh"),
            Self::Sh => write!(f, "sh"),
            Self::Fish => write!(f, "fish"),
            Self::Nu => write!(f, "nu"),
            Self::Pwsh => write!(f, "pwsh"),
            Self::PowerShellClassic => write!(f, "powershell"),
            Self::Cmd => write!(f, "cmd"),
            Self::GitBash => write!(f, "gitbash"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for ShellDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Self::Bash),
            "zsh" => Ok(Self::Zsh),
            "sh" => Ok(Self::Sh),
            "fish" => Ok(Self::Fish),
            "nu" | "nushell" => Ok(Self::Nu),
            "pwsh" => Ok(Self::Pwsh),
            "powershell" => Ok(Self::PowerShellClassic),
            "cmd" => Ok(Self::Cmd),
            "gitbash" | "git-bash" => Ok(Self::GitBash),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown shell: {}", s)),
        }
    }
}

/// Steps per dialect; the `Unknown` key is the dialect-agnostic fallback
pub type ShellCommandMap = HashMap<ShellDialect, Vec<CommandStep>>;

/// How to run and activate an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecInfo {
    /// Default executable and arguments
    pub run: CommandStep,
    /// Direct invocation that needs no shell activation
    #[serde(default)]
    pub activated_run: Option<CommandStep>,
    #[serde(default)]
    pub activation: Option<Vec<CommandStep>>,
    #[serde(default)]
    pub deactivation: Option<Vec<CommandStep>>,
    #[serde(default)]
    pub shell_activation: Option<ShellCommandMap>,
    #[serde(default)]
    pub shell_deactivation: Option<ShellCommandMap>,
}

impl ExecInfo {
    pub fn new(run: CommandStep) -> Self {
        Self {
            run,
            activated_run: None,
            activation: None,
            deactivation: None,
            shell_activation: None,
            shell_deactivation: None,
        }
    }
}

/// An environment descriptor supplied by the environment resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonEnvironment {
    pub env_id: EnvironmentId,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub display_path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub exec_info: ExecInfo,
}

impl PythonEnvironment {
    pub fn new(env_id: impl Into<String>, name: impl Into<String>, exec_info: ExecInfo) -> Self {
        Self {
            env_id: EnvironmentId::new(env_id),
            name: name.into(),
            display_name: None,
            display_path: None,
            version: None,
            exec_info,
        }
    }

    /// Human readable label
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Parse a descriptor from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HostError::InvalidEnvironment(e.to_string()))
    }

    /// Load a descriptor from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Options for creating a terminal
#[derive(Debug, Clone, Default)]
pub struct TerminalOptions {
    /// Terminal title
    pub name: Option<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Shell executable override
    pub shell_path: Option<String>,
    /// Create without revealing it
    pub hide_from_user: bool,
}
