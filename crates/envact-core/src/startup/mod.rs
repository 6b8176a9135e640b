//! Shell startup script providers
//!
//! Each provider owns the activation hook for one shell family. The hook is a
//! marker region in the shell's profile that evaluates an environment variable
//! (see [`crate::ShellEnvVarProvider`]) when the shell starts.

mod cmd;
mod context;
mod fish;
mod nu;
mod posix;
mod powershell;
mod region;
mod registry;

pub use cmd::CmdStartupProvider;
pub use context::{Platform, ShellContext};
pub use fish::FishStartupProvider;
pub use nu::NuStartupProvider;
pub use posix::{BashStartupProvider, ZshStartupProvider};
pub use powershell::PowerShellStartupProvider;
pub use region::{line_ending, MarkerRegion, RegionRemoval};
pub use registry::{parse_reg_query_output, AutoRunRegistry, RegCommandRegistry};

use async_trait::async_trait;
use envact_host::ShellDialect;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Whether a shell's profile carries the activation hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSetupState {
    NotSetup,
    Setup,
    /// The shell itself is not installed
    NotInstalled,
}

impl std::fmt::Display for ShellSetupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSetup => write!(f, "not set up"),
            Self::Setup => write!(f, "set up"),
            Self::NotInstalled => write!(f, "not installed"),
        }
    }
}

/// Result of editing a shell's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellScriptEditState {
    NotEdited,
    Edited,
    /// The shell itself is not installed
    NotInstalled,
}

impl std::fmt::Display for ShellScriptEditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEdited => write!(f, "not edited"),
            Self::Edited => write!(f, "edited"),
            Self::NotInstalled => write!(f, "not installed"),
        }
    }
}

/// Installs, detects and removes the activation hook of one shell family
#[async_trait]
pub trait ShellStartupScriptProvider: Send + Sync {
    /// Short name used in logs and the CLI
    fn name(&self) -> &'static str;

    /// Dialects whose terminals are served by this provider
    fn dialects(&self) -> &'static [ShellDialect];

    /// Environment variable evaluated by the hook
    fn env_key(&self) -> &'static str;

    /// Profile files the hook lives in (may be empty if the shell is missing)
    async fn profile_paths(&self) -> Vec<PathBuf>;

    async fn is_setup(&self) -> ShellSetupState;

    async fn setup_scripts(&self) -> ShellScriptEditState;

    async fn teardown_scripts(&self) -> ShellScriptEditState;
}

/// Setup state of a set of profiles sharing one hook
pub(crate) async fn profiles_setup_state(
    paths: &[PathBuf],
    region: MarkerRegion,
    key: &str,
) -> ShellSetupState {
    if paths.is_empty() {
        return ShellSetupState::NotSetup;
    }

    let checks = join_all(paths.iter().map(|p| region::has_region_with_key(p, region, key))).await;
    let mut all_setup = true;
    for (path, check) in paths.iter().zip(checks) {
        match check {
            Ok(true) => {}
            Ok(false) => all_setup = false,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                all_setup = false;
            }
        }
    }

    if all_setup {
        ShellSetupState::Setup
    } else {
        ShellSetupState::NotSetup
    }
}

/// Add the hook to every profile; all of them must succeed
pub(crate) async fn setup_profiles(
    paths: &[PathBuf],
    region: MarkerRegion,
    key: &str,
    body: &str,
) -> ShellScriptEditState {
    if paths.is_empty() {
        return ShellScriptEditState::NotEdited;
    }

    let results = join_all(paths.iter().map(|p| region::ensure_region(p, region, key, body))).await;
    let mut all_ok = true;
    for (path, result) in paths.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!("Failed to add activation to {}: {}", path.display(), e);
            all_ok = false;
        }
    }

    if all_ok {
        ShellScriptEditState::Edited
    } else {
        ShellScriptEditState::NotEdited
    }
}

/// Remove the hook from every profile; missing files or regions are fine
pub(crate) async fn teardown_profiles(paths: &[PathBuf], region: MarkerRegion) -> ShellScriptEditState {
    let results = join_all(paths.iter().map(|p| region::strip_region(p, region))).await;
    let mut all_ok = true;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(removal) => tracing::debug!("{}: {:?}", path.display(), removal),
            Err(e) => {
                tracing::warn!("Failed to remove activation from {}: {}", path.display(), e);
                all_ok = false;
            }
        }
    }

    if all_ok {
        ShellScriptEditState::Edited
    } else {
        ShellScriptEditState::NotEdited
    }
}

/// Startup providers registered per dialect
#[derive(Clone)]
pub struct StartupProviders {
    providers: Vec<Arc<dyn ShellStartupScriptProvider>>,
    by_dialect: HashMap<ShellDialect, Arc<dyn ShellStartupScriptProvider>>,
}

impl StartupProviders {
    /// The providers that make sense on the context's platform
    pub fn new(ctx: Arc<ShellContext>, registry: Arc<dyn AutoRunRegistry>) -> Self {
        let mut providers: Vec<Arc<dyn ShellStartupScriptProvider>> = vec![
            Arc::new(BashStartupProvider::new(ctx.clone())),
            Arc::new(ZshStartupProvider::new(ctx.clone())),
            Arc::new(FishStartupProvider::new(ctx.clone())),
            Arc::new(NuStartupProvider::new(ctx.clone())),
            Arc::new(PowerShellStartupProvider::new(ctx.clone())),
        ];
        if ctx.platform.is_windows() {
            providers.push(Arc::new(CmdStartupProvider::new(ctx.clone(), registry)));
        }
        Self::from_providers(providers)
    }

    pub fn from_providers(providers: Vec<Arc<dyn ShellStartupScriptProvider>>) -> Self {
        let mut by_dialect = HashMap::new();
        for provider in &providers {
            for dialect in provider.dialects() {
                by_dialect.insert(*dialect, provider.clone());
            }
        }
        Self {
            providers,
            by_dialect,
        }
    }

    /// Provider responsible for `dialect`, if startup activation is supported
    pub fn for_dialect(&self, dialect: ShellDialect) -> Option<Arc<dyn ShellStartupScriptProvider>> {
        self.by_dialect.get(&dialect).cloned()
    }

    /// Provider by its short name
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn ShellStartupScriptProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn all(&self) -> &[Arc<dyn ShellStartupScriptProvider>] {
        &self.providers
    }
}
