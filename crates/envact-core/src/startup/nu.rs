//! Nushell startup hook

use super::context::probe_shell;
use super::{
    profiles_setup_state, setup_profiles, teardown_profiles, MarkerRegion, ShellContext,
    ShellScriptEditState, ShellSetupState, ShellStartupScriptProvider,
};
use crate::NU_ACTIVATE_KEY;
use async_trait::async_trait;
use envact_host::ShellDialect;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Hook in nushell's `config.nu`.
///
/// Nushell cannot evaluate a string in the current scope, so the hook
/// re-executes nu with the activation command once the variable is cleared.
pub struct NuStartupProvider {
    ctx: Arc<ShellContext>,
}

impl NuStartupProvider {
    pub fn new(ctx: Arc<ShellContext>) -> Self {
        Self { ctx }
    }

    fn default_config(&self) -> PathBuf {
        self.ctx.app_config_dir.join("nushell").join("config.nu")
    }

    async fn config_nu(&self, nu: &Path) -> PathBuf {
        if self.ctx.probe_profiles {
            if let Some(reported) = probe_shell(nu, &["-c", "$nu.config-path"]).await {
                return PathBuf::from(reported);
            }
        }
        self.default_config()
    }

    fn hook(&self) -> String {
        let key = self.env_key();
        format!(
            "if \"{key}\" in $env {{\n    let activation = $env.{key}\n    hide-env {key}\n    exec $nu.current-exe --execute $activation\n}}",
            key = key
        )
    }
}

#[async_trait]
impl ShellStartupScriptProvider for NuStartupProvider {
    fn name(&self) -> &'static str {
        "nu"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Nu]
    }

    fn env_key(&self) -> &'static str {
        NU_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        match self.ctx.find_executable("nu") {
            Some(nu) => vec![self.config_nu(&nu).await],
            None => Vec::new(),
        }
    }

    async fn is_setup(&self) -> ShellSetupState {
        let Some(nu) = self.ctx.find_executable("nu") else {
            return ShellSetupState::NotInstalled;
        };
        let config = self.config_nu(&nu).await;
        profiles_setup_state(&[config], MarkerRegion::HASH, self.env_key()).await
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        let Some(nu) = self.ctx.find_executable("nu") else {
            return ShellScriptEditState::NotInstalled;
        };
        let config = self.config_nu(&nu).await;
        setup_profiles(&[config], MarkerRegion::HASH, self.env_key(), &self.hook()).await
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        let Some(nu) = self.ctx.find_executable("nu") else {
            return ShellScriptEditState::NotInstalled;
        };
        let config = self.config_nu(&nu).await;
        teardown_profiles(&[config], MarkerRegion::HASH).await
    }
}
