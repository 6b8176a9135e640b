//! fish startup hook

use super::{
    profiles_setup_state, setup_profiles, teardown_profiles, MarkerRegion, ShellContext,
    ShellScriptEditState, ShellSetupState, ShellStartupScriptProvider,
};
use crate::FISH_ACTIVATE_KEY;
use async_trait::async_trait;
use envact_host::ShellDialect;
use std::path::PathBuf;
use std::sync::Arc;

/// Hook in `$XDG_CONFIG_HOME/fish/config.fish`
pub struct FishStartupProvider {
    ctx: Arc<ShellContext>,
}

impl FishStartupProvider {
    pub fn new(ctx: Arc<ShellContext>) -> Self {
        Self { ctx }
    }

    fn config_fish(&self) -> PathBuf {
        self.ctx.xdg_config_dir.join("fish").join("config.fish")
    }

    fn hook(&self) -> String {
        let key = self.env_key();
        format!("if set -q {key}\n    eval ${key}\nend", key = key)
    }
}

#[async_trait]
impl ShellStartupScriptProvider for FishStartupProvider {
    fn name(&self) -> &'static str {
        "fish"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Fish]
    }

    fn env_key(&self) -> &'static str {
        FISH_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        vec![self.config_fish()]
    }

    async fn is_setup(&self) -> ShellSetupState {
        if self.ctx.find_executable("fish").is_none() {
            return ShellSetupState::NotInstalled;
        }
        profiles_setup_state(&[self.config_fish()], MarkerRegion::HASH, self.env_key()).await
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        if self.ctx.find_executable("fish").is_none() {
            return ShellScriptEditState::NotInstalled;
        }
        setup_profiles(
            &[self.config_fish()],
            MarkerRegion::HASH,
            self.env_key(),
            &self.hook(),
        )
        .await
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        if self.ctx.find_executable("fish").is_none() {
            return ShellScriptEditState::NotInstalled;
        }
        teardown_profiles(&[self.config_fish()], MarkerRegion::HASH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::Platform;
    use crate::test_support::{isolated_context, read};

    #[tokio::test]
    async fn test_fish_setup_creates_config_dir() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["fish"]);
        let provider = FishStartupProvider::new(ctx);

        assert_eq!(provider.is_setup().await, ShellSetupState::NotSetup);
        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);

        let config = read(&tmp.path().join(".config/fish/config.fish"));
        assert_eq!(
            config,
            "# >>> vscode python\nif set -q VSCODE_FISH_ACTIVATE\n    eval $VSCODE_FISH_ACTIVATE\nend\n# <<< vscode python\n"
        );
        assert_eq!(provider.is_setup().await, ShellSetupState::Setup);
    }

    #[tokio::test]
    async fn test_fish_idempotent_setup_and_roundtrip() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["fish"]);
        let path = tmp.path().join(".config/fish/config.fish");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let original = "set -gx EDITOR nvim\n";
        std::fs::write(&path, original).unwrap();
        let provider = FishStartupProvider::new(ctx);

        provider.setup_scripts().await;
        provider.setup_scripts().await;
        assert_eq!(read(&path).matches("# >>> vscode python").count(), 1);

        assert_eq!(provider.teardown_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(read(&path), original);
    }
}
