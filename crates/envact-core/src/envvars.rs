//! Activation commands published as environment variables
//!
//! In shell-startup mode the profile hooks installed by
//! [`crate::startup`] evaluate one variable per shell family. These providers
//! keep those variables in the host's environment collection in sync with
//! the selected environment.

use crate::command::activation_command;
use crate::startup::Platform;
use envact_host::{EnvironmentVariableCollection, PythonEnvironment, ShellDialect};
use std::collections::HashMap;

pub const BASH_ACTIVATE_KEY: &str = "VSCODE_BASH_ACTIVATE";
pub const ZSH_ACTIVATE_KEY: &str = "VSCODE_ZSH_ACTIVATE";
pub const FISH_ACTIVATE_KEY: &str = "VSCODE_FISH_ACTIVATE";
pub const NU_ACTIVATE_KEY: &str = "VSCODE_NU_ACTIVATE";
pub const PWSH_ACTIVATE_KEY: &str = "VSCODE_PWSH_ACTIVATE";
pub const CMD_ACTIVATE_KEY: &str = "VSCODE_CMD_ACTIVATE";

/// Variable evaluated by the startup hook of `dialect`'s shell family
pub fn env_key_for(dialect: ShellDialect) -> Option<&'static str> {
    match dialect {
        ShellDialect::Bash | ShellDialect::GitBash => Some(BASH_ACTIVATE_KEY),
        ShellDialect::Zsh => Some(ZSH_ACTIVATE_KEY),
        ShellDialect::Fish => Some(FISH_ACTIVATE_KEY),
        ShellDialect::Nu => Some(NU_ACTIVATE_KEY),
        ShellDialect::Pwsh | ShellDialect::PowerShellClassic => Some(PWSH_ACTIVATE_KEY),
        ShellDialect::Cmd => Some(CMD_ACTIVATE_KEY),
        ShellDialect::Sh | ShellDialect::Unknown => None,
    }
}

/// Publishes the activation command of one dialect under its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellEnvVarProvider {
    dialect: ShellDialect,
    key: &'static str,
}

impl ShellEnvVarProvider {
    pub fn new(dialect: ShellDialect) -> Option<Self> {
        env_key_for(dialect).map(|key| Self { dialect, key })
    }

    pub fn dialect(&self) -> ShellDialect {
        self.dialect
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Set the key to `env`'s activation command, or delete it when there is
    /// none. An unchanged value is left alone.
    pub fn update_env_variables(
        &self,
        collection: &dyn EnvironmentVariableCollection,
        env: &PythonEnvironment,
    ) {
        match activation_command(env, self.dialect) {
            Some(command) => {
                if collection.get(self.key).as_deref() == Some(command.as_str()) {
                    tracing::debug!("{} unchanged", self.key);
                    return;
                }
                tracing::debug!("Setting {} for {}", self.key, env.env_id);
                collection.replace(self.key, &command);
            }
            None => {
                tracing::debug!("No {} activation for {}, clearing {}", self.dialect, env.env_id, self.key);
                collection.delete(self.key);
            }
        }
    }

    pub fn remove_env_variables(&self, collection: &dyn EnvironmentVariableCollection) {
        collection.delete(self.key);
    }

    /// The variables this provider would publish for `env`
    pub fn get_env_variables(&self, env: Option<&PythonEnvironment>) -> HashMap<String, Option<String>> {
        let value = env.and_then(|env| activation_command(env, self.dialect));
        HashMap::from([(self.key.to_string(), value)])
    }
}

/// One provider per key for `platform`.
///
/// On Windows the bash key carries Git Bash syntax; elsewhere plain bash.
/// pwsh and Windows PowerShell share a key, so only pwsh is registered.
pub fn env_var_providers(platform: Platform) -> Vec<ShellEnvVarProvider> {
    let dialects: &[ShellDialect] = if platform.is_windows() {
        &[
            ShellDialect::GitBash,
            ShellDialect::Zsh,
            ShellDialect::Fish,
            ShellDialect::Nu,
            ShellDialect::Pwsh,
            ShellDialect::Cmd,
        ]
    } else {
        &[
            ShellDialect::Bash,
            ShellDialect::Zsh,
            ShellDialect::Fish,
            ShellDialect::Nu,
            ShellDialect::Pwsh,
        ]
    };
    dialects
        .iter()
        .filter_map(|d| ShellEnvVarProvider::new(*d))
        .collect()
}
