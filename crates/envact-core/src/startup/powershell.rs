//! PowerShell startup hooks (PowerShell 7+ and Windows PowerShell 5.1)

use super::context::probe_shell;
use super::{
    profiles_setup_state, setup_profiles, teardown_profiles, MarkerRegion, Platform,
    ShellContext, ShellScriptEditState, ShellSetupState, ShellStartupScriptProvider,
};
use crate::PWSH_ACTIVATE_KEY;
use async_trait::async_trait;
use envact_host::ShellDialect;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROFILE_FILE: &str = "Microsoft.PowerShell_profile.ps1";

/// A PowerShell edition with its own profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edition {
    Pwsh,
    WindowsPowerShell,
}

impl Edition {
    fn executable(&self) -> &'static str {
        match self {
            Self::Pwsh => "pwsh",
            Self::WindowsPowerShell => "powershell",
        }
    }
}

/// Hook in the current-user profile of every installed edition.
/// All discovered profiles must carry the hook for the shell to count as set up.
pub struct PowerShellStartupProvider {
    ctx: Arc<ShellContext>,
}

impl PowerShellStartupProvider {
    pub fn new(ctx: Arc<ShellContext>) -> Self {
        Self { ctx }
    }

    fn locate(&self, edition: Edition) -> Option<PathBuf> {
        let known: Vec<PathBuf> = match edition {
            Edition::Pwsh => self
                .ctx
                .program_files
                .iter()
                .map(|pf| pf.join("PowerShell").join("7").join("pwsh.exe"))
                .collect(),
            Edition::WindowsPowerShell => self
                .ctx
                .system_root
                .iter()
                .map(|root| {
                    root.join("System32")
                        .join("WindowsPowerShell")
                        .join("v1.0")
                        .join("powershell.exe")
                })
                .collect(),
        };
        self.ctx.find_shell(edition.executable(), &known)
    }

    fn installed_editions(&self) -> Vec<(Edition, PathBuf)> {
        let mut editions = vec![Edition::Pwsh];
        if self.ctx.platform.is_windows() {
            editions.push(Edition::WindowsPowerShell);
        }
        editions
            .into_iter()
            .filter_map(|e| self.locate(e).map(|exe| (e, exe)))
            .collect()
    }

    fn default_profile(&self, edition: Edition) -> PathBuf {
        match (edition, self.ctx.platform) {
            (Edition::Pwsh, Platform::Windows) => {
                self.ctx.documents_dir.join("PowerShell").join(PROFILE_FILE)
            }
            (Edition::Pwsh, _) => self.ctx.xdg_config_dir.join("powershell").join(PROFILE_FILE),
            (Edition::WindowsPowerShell, _) => self
                .ctx
                .documents_dir
                .join("WindowsPowerShell")
                .join(PROFILE_FILE),
        }
    }

    async fn profile_for(&self, edition: Edition, exe: &Path) -> PathBuf {
        if self.ctx.probe_profiles {
            let args = ["-NoProfile", "-NonInteractive", "-Command", "$PROFILE"];
            if let Some(reported) = probe_shell(exe, &args).await {
                return PathBuf::from(reported);
            }
        }
        self.default_profile(edition)
    }

    /// Profiles of every installed edition; empty when none is installed
    async fn profiles(&self) -> Vec<PathBuf> {
        let mut profiles = Vec::new();
        for (edition, exe) in self.installed_editions() {
            let profile = self.profile_for(edition, &exe).await;
            if !profiles.contains(&profile) {
                profiles.push(profile);
            }
        }
        profiles
    }

    fn hook(&self) -> String {
        let key = self.env_key();
        format!(
            "if ($null -ne $env:{key}) {{\n    try {{\n        Invoke-Expression $env:{key}\n    }} catch {{\n        Write-Error \"Failed to activate environment: $_\"\n    }}\n}}",
            key = key
        )
    }
}

#[async_trait]
impl ShellStartupScriptProvider for PowerShellStartupProvider {
    fn name(&self) -> &'static str {
        "pwsh"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Pwsh, ShellDialect::PowerShellClassic]
    }

    fn env_key(&self) -> &'static str {
        PWSH_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        self.profiles().await
    }

    async fn is_setup(&self) -> ShellSetupState {
        let profiles = self.profiles().await;
        if profiles.is_empty() {
            return ShellSetupState::NotInstalled;
        }
        profiles_setup_state(&profiles, MarkerRegion::POWERSHELL, self.env_key()).await
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        let profiles = self.profiles().await;
        if profiles.is_empty() {
            return ShellScriptEditState::NotInstalled;
        }
        setup_profiles(
            &profiles,
            MarkerRegion::POWERSHELL,
            self.env_key(),
            &self.hook(),
        )
        .await
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        let profiles = self.profiles().await;
        if profiles.is_empty() {
            return ShellScriptEditState::NotInstalled;
        }
        teardown_profiles(&profiles, MarkerRegion::POWERSHELL).await
    }
}
