//! Host collaborator traits and the environment model for envact
//!
//! The activation core never owns terminals, settings UI or environment
//! discovery. This crate describes those collaborators as traits so the core
//! can be driven by an editor, a terminal multiplexer or a test harness.

mod env_collection;
mod error;
mod types;

pub use env_collection::MemoryEnvCollection;
pub use error::*;
pub use types::*;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle to a terminal owned by the host
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Stable identity for the lifetime of the terminal
    fn id(&self) -> TerminalId;

    /// Title shown to the user
    fn name(&self) -> String;

    /// Dialect of the shell running in the terminal, as detected by the host
    fn shell_dialect(&self) -> ShellDialect;

    /// Whether trackable command execution is available right now
    fn has_shell_integration(&self) -> bool;

    /// Directory the terminal was started in
    fn cwd(&self) -> Option<PathBuf>;

    /// Type text into the terminal followed by a newline. No completion signal.
    fn send_text(&self, text: &str);

    /// Run a command through shell integration and wait for it to finish.
    /// Returns the exit code when the host reports one.
    async fn execute_command(&self, command: &str) -> Result<Option<i32>>;

    /// Reveal the terminal to the user
    fn show(&self);
}

/// Lifecycle notifications from the host
#[derive(Clone)]
pub enum TerminalEvent {
    Opened(Arc<dyn Terminal>),
    Closed(TerminalId),
    /// Shell integration became available (or the shell type changed)
    ShellIntegrationChanged(Arc<dyn Terminal>),
    /// The selected environment for a scope changed
    EnvironmentChanged { scope: Option<PathBuf> },
}

impl std::fmt::Debug for TerminalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened(t) => write!(f, "Opened({})", t.id()),
            Self::Closed(id) => write!(f, "Closed({})", id),
            Self::ShellIntegrationChanged(t) => write!(f, "ShellIntegrationChanged({})", t.id()),
            Self::EnvironmentChanged { scope } => write!(f, "EnvironmentChanged({:?})", scope),
        }
    }
}

/// The hosting environment that owns terminals
#[async_trait]
pub trait TerminalHost: Send + Sync {
    /// Currently open terminals
    fn terminals(&self) -> Vec<Arc<dyn Terminal>>;

    /// Create a new terminal. The host decides whether it is visible.
    async fn create_terminal(&self, options: &TerminalOptions) -> Result<Arc<dyn Terminal>>;

    /// Environment variables applied to terminals started in `scope`
    /// (a workspace folder), or globally when `scope` is `None`
    fn environment_collection(&self, scope: Option<&Path>) -> Arc<dyn EnvironmentVariableCollection>;

    /// Workspace folders that get their own environment collection
    fn workspace_folders(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Resolves which environment is selected for a scope
#[async_trait]
pub trait EnvironmentResolver: Send + Sync {
    async fn get_environment(&self, scope: Option<&Path>) -> Option<PythonEnvironment>;
}

/// Process environment variables injected into new terminals
pub trait EnvironmentVariableCollection: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn replace(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
}

/// Asks the user for consent before shell profiles are edited
#[async_trait]
pub trait SetupPrompt: Send + Sync {
    async fn confirm_shell_setup(&self, shells: &[ShellDialect]) -> bool;
}

/// Prompt that always gives the same answer (non-interactive use)
pub struct FixedPrompt(pub bool);

#[async_trait]
impl SetupPrompt for FixedPrompt {
    async fn confirm_shell_setup(&self, shells: &[ShellDialect]) -> bool {
        tracing::debug!("Non-interactive setup prompt for {:?}: {}", shells, self.0);
        self.0
    }
}
