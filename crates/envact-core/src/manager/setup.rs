//! Consent prompt and startup script setup for TerminalManager

use crate::startup::{ShellScriptEditState, ShellSetupState, ShellStartupScriptProvider};
use envact_host::ShellDialect;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::TerminalManager;

impl TerminalManager {
    pub(super) async fn spawn_setup_check(self: &Arc<Self>, dialect: ShellDialect) {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.handle_setup_check(&[dialect]).await;
        });
        self.background.lock().await.push(handle);
    }

    /// Wait for every setup flow started in the background
    pub async fn wait_for_background_setup(&self) {
        let handles: Vec<_> = self.background.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Background setup task failed: {}", e);
            }
        }
    }

    /// Ask once for consent to edit the profiles of every shell in `dialects`
    /// that lacks the startup hook, then install the hooks.
    ///
    /// Returns the edit result per provider that was set up.
    pub async fn handle_setup_check(
        self: &Arc<Self>,
        dialects: &[ShellDialect],
    ) -> Vec<(&'static str, ShellScriptEditState)> {
        let _guard = self.setup_lock.lock().await;

        let mut pending: Vec<Arc<dyn ShellStartupScriptProvider>> = Vec::new();
        let mut asked: Vec<ShellDialect> = Vec::new();
        for dialect in dialects {
            let Some(provider) = self.startup.for_dialect(*dialect) else {
                continue;
            };
            if pending.iter().any(|p| p.name() == provider.name()) {
                if !asked.contains(dialect) {
                    asked.push(*dialect);
                }
                continue;
            }

            let state = provider.is_setup().await;
            self.cache_state(provider.as_ref(), state).await;
            if state == ShellSetupState::NotSetup {
                pending.push(provider);
                asked.push(*dialect);
            }
        }

        if pending.is_empty() {
            return Vec::new();
        }

        if self.setup_declined.load(Ordering::SeqCst) {
            tracing::trace!("Shell startup setup declined earlier, staying with command activation");
            return Vec::new();
        }

        if !self.prompt.confirm_shell_setup(&asked).await {
            tracing::trace!("User declined shell startup setup for {:?}", asked);
            self.setup_declined.store(true, Ordering::SeqCst);
            return Vec::new();
        }

        let results = futures::future::join_all(
            pending
                .iter()
                .map(|provider| async move { (provider.clone(), provider.setup_scripts().await) }),
        )
        .await;

        let mut edits = Vec::new();
        for (provider, result) in results {
            match result {
                ShellScriptEditState::Edited => {
                    tracing::info!("Installed {} startup hook", provider.name());
                    self.cache_state(provider.as_ref(), ShellSetupState::Setup).await;
                }
                other => {
                    tracing::warn!("Could not install {} startup hook: {}", provider.name(), other);
                }
            }
            edits.push((provider.name(), result));
        }

        self.update_all_env_variables().await;
        edits
    }

    pub(super) async fn cache_state(&self, provider: &dyn ShellStartupScriptProvider, state: ShellSetupState) {
        let mut cache = self.setup_cache.write().await;
        for dialect in provider.dialects() {
            cache.insert(*dialect, state);
        }
    }
}
