//! Host events and environment variable publishing for TerminalManager

use envact_config::AutoActivationType;
use envact_host::{Terminal, TerminalEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::TerminalManager;

impl TerminalManager {
    /// React to one host event
    pub async fn handle_event(self: &Arc<Self>, event: TerminalEvent) {
        tracing::debug!("Terminal event: {:?}", event);
        match event {
            TerminalEvent::Opened(terminal) | TerminalEvent::ShellIntegrationChanged(terminal) => {
                self.activate_for_scope(&terminal).await;
            }
            TerminalEvent::Closed(id) => {
                self.activation.terminal_closed(id).await;
                self.evict_terminal(id).await;
            }
            TerminalEvent::EnvironmentChanged { scope } => {
                self.update_env_variables(scope.as_deref()).await;
                self.reactivate_scope(scope.as_deref()).await;
            }
        }
    }

    /// Handle host events until the sender goes away
    pub async fn run_event_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TerminalEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("Terminal event channel closed");
    }

    /// Command-activate `terminal` with the environment of its directory
    pub(super) async fn activate_for_scope(self: &Arc<Self>, terminal: &Arc<dyn Terminal>) {
        let mode = self.activation_type_for(terminal.shell_dialect()).await;
        if mode != AutoActivationType::Command {
            tracing::debug!("Terminal {} uses {} activation", terminal.id(), mode);
            return;
        }

        let cwd = terminal.cwd();
        match self.resolver.get_environment(cwd.as_deref()).await {
            Some(env) => self.activation.activate(terminal, &env).await,
            None => tracing::debug!("No environment selected for terminal {}", terminal.id()),
        }
    }

    /// The selected environment of `scope` changed; switch its terminals
    async fn reactivate_scope(self: &Arc<Self>, scope: Option<&Path>) {
        let terminals: Vec<_> = self
            .host
            .terminals()
            .into_iter()
            .filter(|t| match (scope, t.cwd()) {
                (None, _) => true,
                (Some(scope), Some(cwd)) => cwd.starts_with(scope),
                (Some(_), None) => false,
            })
            .collect();

        futures::future::join_all(terminals.iter().map(|t| self.activate_for_scope(t))).await;
    }

    /// Publish the activation variables for `scope`, or remove them when
    /// shell-startup activation is not in use
    pub async fn update_env_variables(&self, scope: Option<&Path>) {
        let collection = self.host.environment_collection(scope);
        if self.mode().await != AutoActivationType::ShellStartup {
            for provider in &self.env_vars {
                provider.remove_env_variables(collection.as_ref());
            }
            return;
        }

        match self.resolver.get_environment(scope).await {
            Some(env) => {
                for provider in &self.env_vars {
                    provider.update_env_variables(collection.as_ref(), &env);
                }
                tracing::debug!("Published activation variables for {}", env.env_id);
            }
            None => {
                for provider in &self.env_vars {
                    provider.remove_env_variables(collection.as_ref());
                }
            }
        }
    }

    /// Every scope: the global collection plus one per workspace folder
    fn scopes(&self) -> Vec<Option<PathBuf>> {
        std::iter::once(None)
            .chain(self.host.workspace_folders().into_iter().map(Some))
            .collect()
    }

    pub(super) async fn update_all_env_variables(&self) {
        for scope in self.scopes() {
            self.update_env_variables(scope.as_deref()).await;
        }
    }

    pub(super) fn remove_all_env_variables(&self) {
        for scope in self.scopes() {
            let collection = self.host.environment_collection(scope.as_deref());
            for provider in &self.env_vars {
                provider.remove_env_variables(collection.as_ref());
            }
        }
    }
}
