//! bash (including Git Bash) and zsh startup hooks

use super::{
    profiles_setup_state, setup_profiles, teardown_profiles, MarkerRegion, Platform,
    ShellContext, ShellScriptEditState, ShellSetupState, ShellStartupScriptProvider,
};
use crate::{BASH_ACTIVATE_KEY, ZSH_ACTIVATE_KEY};
use async_trait::async_trait;
use envact_host::ShellDialect;
use std::path::PathBuf;
use std::sync::Arc;

fn posix_hook(key: &str) -> String {
    format!(
        "if [ -n \"${{{key}:-}}\" ]; then\n    eval \"${key}\" || true\nfi",
        key = key
    )
}

/// Hook in `~/.bashrc` and `~/.bash_profile`
pub struct BashStartupProvider {
    ctx: Arc<ShellContext>,
}

impl BashStartupProvider {
    pub fn new(ctx: Arc<ShellContext>) -> Self {
        Self { ctx }
    }

    fn is_installed(&self) -> bool {
        let known: Vec<PathBuf> = match (&self.ctx.platform, &self.ctx.program_files) {
            (Platform::Windows, Some(pf)) => vec![pf.join("Git").join("bin").join("bash.exe")],
            _ => Vec::new(),
        };
        self.ctx.find_shell("bash", &known).is_some()
    }

    /// Every existing candidate, or the platform default when none exists
    pub fn candidate_profiles(&self) -> Vec<PathBuf> {
        let home = &self.ctx.home_dir;
        let existing: Vec<PathBuf> = [".bashrc", ".bash_profile"]
            .iter()
            .map(|name| home.join(name))
            .filter(|p| p.is_file())
            .collect();

        if !existing.is_empty() {
            return existing;
        }

        match self.ctx.platform {
            Platform::MacOs => vec![home.join(".bash_profile")],
            _ => vec![home.join(".bashrc")],
        }
    }
}

#[async_trait]
impl ShellStartupScriptProvider for BashStartupProvider {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Bash, ShellDialect::GitBash]
    }

    fn env_key(&self) -> &'static str {
        BASH_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        self.candidate_profiles()
    }

    async fn is_setup(&self) -> ShellSetupState {
        if !self.is_installed() {
            return ShellSetupState::NotInstalled;
        }
        profiles_setup_state(&self.candidate_profiles(), MarkerRegion::HASH, self.env_key()).await
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }
        let body = posix_hook(self.env_key());
        setup_profiles(&self.candidate_profiles(), MarkerRegion::HASH, self.env_key(), &body).await
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }
        let home = &self.ctx.home_dir;
        let paths = vec![home.join(".bashrc"), home.join(".bash_profile")];
        teardown_profiles(&paths, MarkerRegion::HASH).await
    }
}

/// Hook in `$ZDOTDIR/.zshrc`
pub struct ZshStartupProvider {
    ctx: Arc<ShellContext>,
}

impl ZshStartupProvider {
    pub fn new(ctx: Arc<ShellContext>) -> Self {
        Self { ctx }
    }

    fn zshrc(&self) -> PathBuf {
        self.ctx
            .zdotdir
            .as_ref()
            .unwrap_or(&self.ctx.home_dir)
            .join(".zshrc")
    }

    fn is_installed(&self) -> bool {
        self.ctx.find_executable("zsh").is_some()
    }
}

#[async_trait]
impl ShellStartupScriptProvider for ZshStartupProvider {
    fn name(&self) -> &'static str {
        "zsh"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Zsh]
    }

    fn env_key(&self) -> &'static str {
        ZSH_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        vec![self.zshrc()]
    }

    async fn is_setup(&self) -> ShellSetupState {
        if !self.is_installed() {
            return ShellSetupState::NotInstalled;
        }
        profiles_setup_state(&[self.zshrc()], MarkerRegion::HASH, self.env_key()).await
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }
        let body = posix_hook(self.env_key());
        setup_profiles(&[self.zshrc()], MarkerRegion::HASH, self.env_key(), &body).await
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }
        teardown_profiles(&[self.zshrc()], MarkerRegion::HASH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{isolated_context, read};

    #[test]
    fn test_posix_hook() {
        assert_eq!(
            posix_hook("VSCODE_BASH_ACTIVATE"),
            "if [ -n \"${VSCODE_BASH_ACTIVATE:-}\" ]; then\n    eval \"$VSCODE_BASH_ACTIVATE\" || true\nfi"
        );
    }

    #[tokio::test]
    async fn test_bash_not_installed_short_circuits() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &[]);
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.is_setup().await, ShellSetupState::NotInstalled);
        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::NotInstalled);
        assert_eq!(provider.teardown_scripts().await, ShellScriptEditState::NotInstalled);
        assert!(!tmp.path().join(".bashrc").exists());
    }

    #[tokio::test]
    async fn test_bash_setup_creates_default_profile() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["bash"]);
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.is_setup().await, ShellSetupState::NotSetup);
        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(provider.is_setup().await, ShellSetupState::Setup);

        let bashrc = read(&tmp.path().join(".bashrc"));
        assert!(bashrc.contains("VSCODE_BASH_ACTIVATE"));
        assert!(!tmp.path().join(".bash_profile").exists());
    }

    #[tokio::test]
    async fn test_bash_macos_default_is_bash_profile() {
        let (tmp, ctx) = isolated_context(Platform::MacOs, &["bash"]);
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);
        assert!(tmp.path().join(".bash_profile").exists());
        assert!(!tmp.path().join(".bashrc").exists());
    }

    #[tokio::test]
    async fn test_bash_edits_every_existing_candidate() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["bash"]);
        std::fs::write(tmp.path().join(".bashrc"), "alias ll='ls -l'\n").unwrap();
        std::fs::write(tmp.path().join(".bash_profile"), "source ~/.bashrc\n").unwrap();
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);

        for name in [".bashrc", ".bash_profile"] {
            let content = read(&tmp.path().join(name));
            assert_eq!(content.matches("# >>> vscode python").count(), 1, "{name}");
        }

        // Removing the hook from one candidate makes the shell not set up
        std::fs::write(tmp.path().join(".bash_profile"), "source ~/.bashrc\n").unwrap();
        assert_eq!(provider.is_setup().await, ShellSetupState::NotSetup);
    }

    #[tokio::test]
    async fn test_bash_roundtrip_restores_profiles() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["bash"]);
        let original = "export EDITOR=vim\n# trailing comment\n";
        std::fs::write(tmp.path().join(".bashrc"), original).unwrap();
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(provider.teardown_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(read(&tmp.path().join(".bashrc")), original);
        assert_eq!(provider.is_setup().await, ShellSetupState::NotSetup);
    }

    #[tokio::test]
    async fn test_bash_teardown_without_marker_is_noop() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["bash"]);
        let original = "export A=1\r\nexport B=2";
        std::fs::write(tmp.path().join(".bashrc"), original).unwrap();
        let provider = BashStartupProvider::new(ctx);

        assert_eq!(provider.teardown_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(read(&tmp.path().join(".bashrc")), original);
    }

    #[tokio::test]
    async fn test_bash_teardown_deletes_created_profile() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["bash"]);
        let provider = BashStartupProvider::new(ctx);

        provider.setup_scripts().await;
        assert!(tmp.path().join(".bashrc").exists());
        provider.teardown_scripts().await;
        assert!(!tmp.path().join(".bashrc").exists());
    }

    #[tokio::test]
    async fn test_zsh_respects_zdotdir() {
        let (tmp, ctx) = isolated_context(Platform::Linux, &["zsh"]);
        let mut ctx = (*ctx).clone();
        ctx.zdotdir = Some(tmp.path().join("zdot"));
        let provider = ZshStartupProvider::new(Arc::new(ctx));

        assert_eq!(provider.setup_scripts().await, ShellScriptEditState::Edited);
        let zshrc = read(&tmp.path().join("zdot").join(".zshrc"));
        assert!(zshrc.contains("eval \"$VSCODE_ZSH_ACTIVATE\""));
        assert_eq!(provider.is_setup().await, ShellSetupState::Setup);
        assert!(!tmp.path().join(".zshrc").exists());
    }
}
