//! Terminal creation and startup activation for TerminalManager

use crate::Result;
use envact_config::AutoActivationType;
use envact_host::{PythonEnvironment, ShellDialect, Terminal, TerminalId, TerminalOptions};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{TerminalCache, TerminalManager};

/// Cache key form of a path: absolute, `.`/`..` resolved, symlinks followed
/// when the path exists
fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl TerminalManager {
    /// Create a terminal for `env`.
    ///
    /// In command mode the terminal is shown and activated before returning.
    /// In shell-startup mode the activation variables travel with the new
    /// terminal's environment and its profile hook does the rest.
    pub async fn create(
        self: &Arc<Self>,
        env: &PythonEnvironment,
        options: &TerminalOptions,
    ) -> Result<Arc<dyn Terminal>> {
        let mut options = options.clone();
        if self.mode().await == AutoActivationType::ShellStartup {
            for provider in &self.env_vars {
                for (key, value) in provider.get_env_variables(Some(env)) {
                    if let Some(value) = value {
                        options.env.insert(key, value);
                    }
                }
            }
        }

        let terminal = self.host.create_terminal(&options).await?;
        tracing::debug!("Created terminal {} for {}", terminal.id(), env.env_id);

        match self.activation_type_for(terminal.shell_dialect()).await {
            AutoActivationType::Command => {
                terminal.show();
                self.activation.activate(&terminal, env).await;
            }
            mode => tracing::debug!("Terminal {} uses {} activation", terminal.id(), mode),
        }
        Ok(terminal)
    }

    /// Terminal dedicated to running `file` with `env`, reused while open
    pub async fn get_dedicated_terminal(
        self: &Arc<Self>,
        file: &Path,
        env: &PythonEnvironment,
    ) -> Result<Arc<dyn Terminal>> {
        let name = file
            .file_name()
            .map(|n| format!("Python: {}", n.to_string_lossy()))
            .unwrap_or_else(|| "Python".to_string());
        let options = TerminalOptions {
            name: Some(name),
            cwd: file.parent().map(Path::to_path_buf),
            ..TerminalOptions::default()
        };
        self.cached_terminal(&self.dedicated, file, env, options).await
    }

    /// Terminal shared by a project folder and `env`, reused while open
    pub async fn get_project_terminal(
        self: &Arc<Self>,
        folder: &Path,
        env: &PythonEnvironment,
    ) -> Result<Arc<dyn Terminal>> {
        let name = folder
            .file_name()
            .map(|n| format!("Python: {}", n.to_string_lossy()))
            .unwrap_or_else(|| "Python".to_string());
        let options = TerminalOptions {
            name: Some(name),
            cwd: Some(folder.to_path_buf()),
            ..TerminalOptions::default()
        };
        self.cached_terminal(&self.project, folder, env, options).await
    }

    /// Look up or create the terminal for `(env, path)`. The write lock is
    /// held while creating so concurrent callers share one terminal.
    async fn cached_terminal(
        self: &Arc<Self>,
        cache: &TerminalCache,
        path: &Path,
        env: &PythonEnvironment,
        options: TerminalOptions,
    ) -> Result<Arc<dyn Terminal>> {
        let key = (env.env_id.clone(), normalize_path(path));
        let mut cache = cache.write().await;
        if let Some(terminal) = cache.get(&key) {
            return Ok(terminal.clone());
        }

        let terminal = self.create(env, &options).await?;
        cache.insert(key, terminal.clone());
        Ok(terminal)
    }

    /// Drop a closed terminal from the dedicated and project caches
    pub(super) async fn evict_terminal(&self, id: TerminalId) {
        for cache in [&self.dedicated, &self.project] {
            cache.write().await.retain(|_, t| t.id() != id);
        }
    }

    /// Bring every terminal that is already open in line with the settings.
    ///
    /// Command mode activates them one by one. Shell-startup mode asks once
    /// for consent covering all their shells, installs the hooks and
    /// publishes the activation variables; shells left without a hook are
    /// activated with commands.
    pub async fn initialize(self: &Arc<Self>) {
        let mode = self.mode().await;
        tracing::info!("Initializing terminal activation ({})", mode);
        let terminals = self.host.terminals();

        match mode {
            AutoActivationType::Off => {
                self.remove_all_env_variables();
            }
            AutoActivationType::Command => {
                self.remove_all_env_variables();
                futures::future::join_all(terminals.iter().map(|t| self.activate_for_scope(t))).await;
            }
            AutoActivationType::ShellStartup => {
                let mut dialects: Vec<ShellDialect> = Vec::new();
                for terminal in &terminals {
                    let dialect = terminal.shell_dialect();
                    if !dialects.contains(&dialect) {
                        dialects.push(dialect);
                    }
                }

                self.handle_setup_check(&dialects).await;
                self.update_all_env_variables().await;
                futures::future::join_all(terminals.iter().map(|t| self.activate_for_scope(t))).await;
            }
        }
    }
}
