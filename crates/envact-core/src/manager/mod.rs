//! Terminal manager - decides how every terminal gets activated

mod events;
mod setup;
mod terminals;

use crate::startup::{
    Platform, RegCommandRegistry, ShellContext, ShellScriptEditState, ShellSetupState,
    StartupProviders,
};
use crate::{env_var_providers, Result, ShellEnvVarProvider, TerminalActivation};
use envact_config::{AutoActivationType, GlobalConfig};
use envact_host::{
    EnvironmentId, EnvironmentResolver, PythonEnvironment, SetupPrompt, ShellDialect, Terminal,
    TerminalHost,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

type TerminalCache = RwLock<HashMap<(EnvironmentId, PathBuf), Arc<dyn Terminal>>>;

/// Setup state of one shell family, as reported by `setup_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellStatus {
    pub shell: &'static str,
    pub env_key: &'static str,
    #[serde(serialize_with = "serialize_display")]
    pub state: ShellSetupState,
    pub profiles: Vec<PathBuf>,
}

fn serialize_display<S: serde::Serializer>(
    state: &ShellSetupState,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(state)
}

/// Coordinates activation across all terminals of a host
pub struct TerminalManager {
    host: Arc<dyn TerminalHost>,
    resolver: Arc<dyn EnvironmentResolver>,
    prompt: Arc<dyn SetupPrompt>,
    config: RwLock<GlobalConfig>,
    startup: StartupProviders,
    env_vars: Vec<ShellEnvVarProvider>,
    activation: TerminalActivation,
    /// `is_setup` results per dialect, kept until settings change
    setup_cache: RwLock<HashMap<ShellDialect, ShellSetupState>>,
    /// The user said no to editing profiles; do not ask again
    setup_declined: AtomicBool,
    /// Serializes the consent prompt and profile edits
    setup_lock: Mutex<()>,
    background: Mutex<Vec<JoinHandle<()>>>,
    dedicated: TerminalCache,
    project: TerminalCache,
}

impl TerminalManager {
    /// Create a manager with explicit collaborators
    pub fn new(
        host: Arc<dyn TerminalHost>,
        resolver: Arc<dyn EnvironmentResolver>,
        prompt: Arc<dyn SetupPrompt>,
        config: GlobalConfig,
        startup: StartupProviders,
        platform: Platform,
    ) -> Arc<Self> {
        let timeout = Duration::from_millis(config.terminal.shell_integration_timeout_ms);
        Arc::new(Self {
            host,
            resolver,
            prompt,
            config: RwLock::new(config),
            startup,
            env_vars: env_var_providers(platform),
            activation: TerminalActivation::new(timeout),
            setup_cache: RwLock::new(HashMap::new()),
            setup_declined: AtomicBool::new(false),
            setup_lock: Mutex::new(()),
            background: Mutex::new(Vec::new()),
            dedicated: RwLock::new(HashMap::new()),
            project: RwLock::new(HashMap::new()),
        })
    }

    /// Create a manager for this machine, with the real shells and registry
    pub fn from_env(
        host: Arc<dyn TerminalHost>,
        resolver: Arc<dyn EnvironmentResolver>,
        prompt: Arc<dyn SetupPrompt>,
        config: GlobalConfig,
    ) -> Result<Arc<Self>> {
        let ctx = Arc::new(ShellContext::from_env(&config.startup)?);
        let platform = ctx.platform;
        let startup = StartupProviders::new(ctx, Arc::new(RegCommandRegistry));
        Ok(Self::new(host, resolver, prompt, config, startup, platform))
    }

    pub fn activation(&self) -> &TerminalActivation {
        &self.activation
    }

    pub fn startup_providers(&self) -> &StartupProviders {
        &self.startup
    }

    pub async fn config(&self) -> GlobalConfig {
        self.config.read().await.clone()
    }

    async fn mode(&self) -> AutoActivationType {
        self.config.read().await.effective_activation_type()
    }

    /// Activation mechanism for a terminal running `dialect`.
    ///
    /// In shell-startup mode a shell only uses its startup hook once the
    /// hook is installed. Until then it falls back to command activation,
    /// and the first time a shell is seen without the hook the consent and
    /// setup flow starts in the background.
    pub async fn activation_type_for(self: &Arc<Self>, dialect: ShellDialect) -> AutoActivationType {
        match self.mode().await {
            AutoActivationType::ShellStartup => {}
            other => return other,
        }

        let Some(provider) = self.startup.for_dialect(dialect) else {
            tracing::debug!("No startup script support for {}, using command activation", dialect);
            return AutoActivationType::Command;
        };

        if let Some(state) = self.setup_cache.read().await.get(&dialect).copied() {
            return match state {
                ShellSetupState::Setup => AutoActivationType::ShellStartup,
                _ => AutoActivationType::Command,
            };
        }

        let state = provider.is_setup().await;
        self.cache_state(provider.as_ref(), state).await;
        tracing::debug!("{} startup hook: {}", provider.name(), state);

        match state {
            ShellSetupState::Setup => AutoActivationType::ShellStartup,
            ShellSetupState::NotSetup => {
                self.spawn_setup_check(dialect).await;
                AutoActivationType::Command
            }
            ShellSetupState::NotInstalled => AutoActivationType::Command,
        }
    }

    /// Replace the settings, forgetting every cached setup decision
    pub async fn update_settings(self: &Arc<Self>, config: GlobalConfig) {
        let previous = self.mode().await;
        *self.config.write().await = config;
        self.clear_setup_cache().await;

        let mode = self.mode().await;
        if previous != mode {
            tracing::info!("Activation type changed from {} to {}", previous, mode);
        }
        self.update_all_env_variables().await;
    }

    async fn clear_setup_cache(&self) {
        self.setup_cache.write().await.clear();
        self.setup_declined.store(false, Ordering::SeqCst);
    }

    /// Setup state of every startup provider
    pub async fn setup_status(&self) -> Vec<ShellStatus> {
        let checks = self.startup.all().iter().map(|provider| async move {
            ShellStatus {
                shell: provider.name(),
                env_key: provider.env_key(),
                state: provider.is_setup().await,
                profiles: provider.profile_paths().await,
            }
        });
        futures::future::join_all(checks).await
    }

    /// Remove every startup hook and the published activation variables
    pub async fn revert_startup_scripts(&self) -> Vec<(&'static str, ShellScriptEditState)> {
        let _guard = self.setup_lock.lock().await;
        let results = futures::future::join_all(
            self.startup
                .all()
                .iter()
                .map(|provider| async move { (provider.name(), provider.teardown_scripts().await) }),
        )
        .await;
        for (name, state) in &results {
            tracing::info!("Teardown {}: {}", name, state);
        }

        self.clear_setup_cache().await;
        self.remove_all_env_variables();
        results
    }

    pub async fn activate(&self, terminal: &Arc<dyn Terminal>, env: &PythonEnvironment) {
        self.activation.activate(terminal, env).await;
    }

    pub async fn deactivate(&self, terminal: &Arc<dyn Terminal>) {
        self.activation.deactivate(terminal).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::ShellStartupScriptProvider;
    use crate::test_support::*;
    use crate::{BASH_ACTIVATE_KEY, ZSH_ACTIVATE_KEY};
    use envact_host::{EnvironmentVariableCollection, TerminalEvent, TerminalId, TerminalOptions};
    use std::path::Path;

    struct Fixture {
        host: Arc<MockHost>,
        resolver: Arc<MockResolver>,
        prompt: Arc<MockPrompt>,
        manager: Arc<TerminalManager>,
    }

    fn config(mode: AutoActivationType) -> GlobalConfig {
        let mut config = GlobalConfig::default();
        config.terminal.auto_activation_type = mode;
        config.terminal.shell_integration_timeout_ms = 0;
        config
    }

    fn fixture(
        mode: AutoActivationType,
        providers: Vec<Arc<dyn ShellStartupScriptProvider>>,
        consent: bool,
    ) -> Fixture {
        fixture_with_host(MockHost::new(ShellDialect::Bash), mode, providers, consent)
    }

    fn fixture_with_host(
        host: MockHost,
        mode: AutoActivationType,
        providers: Vec<Arc<dyn ShellStartupScriptProvider>>,
        consent: bool,
    ) -> Fixture {
        let host = Arc::new(host);
        let resolver = Arc::new(MockResolver::new(Some(conda_env("myenv"))));
        let prompt = Arc::new(MockPrompt::new(consent));
        let manager = TerminalManager::new(
            host.clone(),
            resolver.clone(),
            prompt.clone(),
            config(mode),
            StartupProviders::from_providers(providers),
            Platform::Linux,
        );
        Fixture {
            host,
            resolver,
            prompt,
            manager,
        }
    }

    fn bash_provider(state: ShellSetupState) -> Arc<MockStartupProvider> {
        Arc::new(MockStartupProvider::new(
            "bash",
            &[ShellDialect::Bash, ShellDialect::GitBash],
            state,
        ))
    }

    fn zsh_provider(state: ShellSetupState) -> Arc<MockStartupProvider> {
        Arc::new(MockStartupProvider::new("zsh", &[ShellDialect::Zsh], state))
    }

    // ==================== Mode resolution ====================

    #[tokio::test]
    async fn test_mode_from_settings() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Command
        );

        let mut off = config(AutoActivationType::ShellStartup);
        off.terminal.activate_environment = false;
        f.manager.update_settings(off).await;
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Off
        );
    }

    #[tokio::test]
    async fn test_shell_startup_without_provider_uses_command() {
        let f = fixture(AutoActivationType::ShellStartup, Vec::new(), true);
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Sh).await,
            AutoActivationType::Command
        );
        f.manager.wait_for_background_setup().await;
        assert!(f.prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn test_not_setup_falls_back_and_sets_up_in_background() {
        let bash = bash_provider(ShellSetupState::NotSetup);
        let f = fixture(AutoActivationType::ShellStartup, vec![bash.clone()], true);

        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Command
        );
        f.manager.wait_for_background_setup().await;

        assert_eq!(f.prompt.asked(), vec![vec![ShellDialect::Bash]]);
        assert_eq!(bash.setup_calls(), 1);
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::ShellStartup
        );
        // Git Bash shares the provider and its cached state
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::GitBash).await,
            AutoActivationType::ShellStartup
        );
        assert_eq!(
            f.host.collection(None).get(BASH_ACTIVATE_KEY).as_deref(),
            Some(" conda activate myenv")
        );
    }

    #[tokio::test]
    async fn test_setup_state_is_cached() {
        let bash = bash_provider(ShellSetupState::NotSetup);
        let f = fixture(AutoActivationType::ShellStartup, vec![bash.clone()], false);

        f.manager.activation_type_for(ShellDialect::Bash).await;
        f.manager.activation_type_for(ShellDialect::Bash).await;
        f.manager.wait_for_background_setup().await;

        // One lookup, one background check, one prompt
        assert_eq!(f.prompt.asked().len(), 1);
        assert_eq!(bash.setup_calls(), 0);
    }

    #[tokio::test]
    async fn test_declined_is_not_asked_again() {
        let bash = bash_provider(ShellSetupState::NotSetup);
        let zsh = zsh_provider(ShellSetupState::NotSetup);
        let f = fixture(
            AutoActivationType::ShellStartup,
            vec![bash.clone(), zsh.clone()],
            false,
        );

        assert!(f.manager.handle_setup_check(&[ShellDialect::Bash]).await.is_empty());
        assert!(f.manager.handle_setup_check(&[ShellDialect::Zsh]).await.is_empty());

        assert_eq!(f.prompt.asked().len(), 1);
        assert_eq!(bash.setup_calls() + zsh.setup_calls(), 0);
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Zsh).await,
            AutoActivationType::Command
        );

        // New settings forget the answer
        f.manager.update_settings(config(AutoActivationType::ShellStartup)).await;
        f.manager.handle_setup_check(&[ShellDialect::Zsh]).await;
        assert_eq!(f.prompt.asked().len(), 2);
    }

    #[tokio::test]
    async fn test_queried_state_cached_for_every_provider_dialect() {
        let bash = bash_provider(ShellSetupState::NotInstalled);
        let f = fixture(AutoActivationType::ShellStartup, vec![bash.clone()], true);

        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Command
        );
        let cache = f.manager.setup_cache.read().await;
        assert_eq!(cache.get(&ShellDialect::Bash), Some(&ShellSetupState::NotInstalled));
        assert_eq!(cache.get(&ShellDialect::GitBash), Some(&ShellSetupState::NotInstalled));
    }

    #[tokio::test]
    async fn test_failed_setup_stays_on_command() {
        let bash = Arc::new(
            MockStartupProvider::new("bash", &[ShellDialect::Bash], ShellSetupState::NotSetup)
                .with_setup_result(ShellScriptEditState::NotEdited),
        );
        let f = fixture(AutoActivationType::ShellStartup, vec![bash.clone()], true);

        let edits = f.manager.handle_setup_check(&[ShellDialect::Bash]).await;
        assert_eq!(edits, vec![("bash", ShellScriptEditState::NotEdited)]);
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Command
        );
    }

    // ==================== Terminal creation ====================

    #[tokio::test]
    async fn test_create_command_mode_shows_then_activates() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let terminal = f
            .manager
            .create(&conda_env("myenv"), &TerminalOptions::default())
            .await
            .unwrap();

        let mock = &f.host.mock_terminals()[0];
        assert_eq!(mock.id(), terminal.id());
        assert_eq!(
            mock.calls(),
            vec![
                TerminalCall::Show,
                TerminalCall::SendText(" conda activate myenv".to_string()),
            ]
        );
        assert!(f.manager.activation().is_activated(terminal.id()).await);
    }

    #[tokio::test]
    async fn test_create_shell_startup_passes_env_variables() {
        let f = fixture(
            AutoActivationType::ShellStartup,
            vec![bash_provider(ShellSetupState::Setup)],
            true,
        );
        let terminal = f
            .manager
            .create(&conda_env("other"), &TerminalOptions::default())
            .await
            .unwrap();

        assert!(f.host.mock_terminals()[0].calls().is_empty());
        assert!(!f.manager.activation().is_activated(terminal.id()).await);
        let options = &f.host.created()[0];
        assert_eq!(
            options.env.get(BASH_ACTIVATE_KEY).map(String::as_str),
            Some(" conda activate other")
        );
    }

    #[tokio::test]
    async fn test_create_off_mode_does_nothing() {
        let f = fixture(AutoActivationType::Off, Vec::new(), true);
        f.manager
            .create(&conda_env("myenv"), &TerminalOptions::default())
            .await
            .unwrap();
        assert!(f.host.mock_terminals()[0].calls().is_empty());
        assert!(f.host.created()[0].env.is_empty());
    }

    #[tokio::test]
    async fn test_dedicated_terminal_cache() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let file = Path::new("/work/project/./main.py");
        let env = conda_env("myenv");

        let first = f.manager.get_dedicated_terminal(file, &env).await.unwrap();
        let again = f
            .manager
            .get_dedicated_terminal(Path::new("/work/project/main.py"), &env)
            .await
            .unwrap();
        assert_eq!(first.id(), again.id());
        assert_eq!(f.host.created().len(), 1);
        assert_eq!(f.host.created()[0].name.as_deref(), Some("Python: main.py"));
        assert_eq!(
            f.host.created()[0].cwd.as_deref(),
            Some(Path::new("/work/project"))
        );

        // Another environment gets its own terminal
        let other = f
            .manager
            .get_dedicated_terminal(file, &conda_env("other"))
            .await
            .unwrap();
        assert_ne!(other.id(), first.id());

        // Closing evicts it
        f.host.close(first.id());
        f.manager.handle_event(TerminalEvent::Closed(first.id())).await;
        let replacement = f.manager.get_dedicated_terminal(file, &env).await.unwrap();
        assert_ne!(replacement.id(), first.id());
        assert_eq!(f.host.created().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_dedicated_requests_share_terminal() {
        let host = MockHost::new(ShellDialect::Bash).with_create_delay(Duration::from_millis(30));
        let f = fixture_with_host(host, AutoActivationType::Command, Vec::new(), true);
        let file = Path::new("/work/project/main.py");
        let env = conda_env("myenv");

        let (first, second) = tokio::join!(
            f.manager.get_dedicated_terminal(file, &env),
            f.manager.get_dedicated_terminal(file, &env)
        );
        assert_eq!(first.unwrap().id(), second.unwrap().id());
        assert_eq!(f.host.created().len(), 1);
        assert_eq!(f.host.mock_terminals().len(), 1);
    }

    #[tokio::test]
    async fn test_project_terminal_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let env = conda_env("myenv");

        let first = f.manager.get_project_terminal(tmp.path(), &env).await.unwrap();
        let again = f
            .manager
            .get_project_terminal(&tmp.path().join("."), &env)
            .await
            .unwrap();
        assert_eq!(first.id(), again.id());
        assert_eq!(f.host.created().len(), 1);
    }

    // ==================== Initialization and events ====================

    #[tokio::test]
    async fn test_initialize_command_mode_activates_per_scope() {
        let host = MockHost::new(ShellDialect::Bash);
        host.add_terminal(MockTerminal::new(1, "bash", ShellDialect::Bash).with_cwd("/a/src"));
        host.add_terminal(MockTerminal::new(2, "zsh", ShellDialect::Zsh).with_cwd("/b"));
        host.add_terminal(MockTerminal::new(3, "Task - test", ShellDialect::Bash));
        let f = fixture_with_host(host, AutoActivationType::Command, Vec::new(), true);
        f.resolver.set_scoped("/a", conda_env("a"));

        f.manager.initialize().await;

        let terminals = f.host.mock_terminals();
        assert_eq!(
            terminals[0].calls(),
            vec![TerminalCall::SendText(" conda activate a".to_string())]
        );
        assert_eq!(
            terminals[1].calls(),
            vec![TerminalCall::SendText(" conda activate myenv".to_string())]
        );
        assert!(terminals[2].calls().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_shell_startup_prompts_once() {
        let host = MockHost::new(ShellDialect::Bash);
        host.add_terminal(MockTerminal::new(1, "bash", ShellDialect::Bash));
        host.add_terminal(MockTerminal::new(2, "zsh", ShellDialect::Zsh));
        host.add_terminal(MockTerminal::new(3, "bash", ShellDialect::Bash));
        host.add_terminal(MockTerminal::new(4, "sh", ShellDialect::Sh));
        let bash = bash_provider(ShellSetupState::NotSetup);
        let zsh = zsh_provider(ShellSetupState::NotSetup);
        let f = fixture_with_host(
            host,
            AutoActivationType::ShellStartup,
            vec![bash.clone(), zsh.clone()],
            true,
        );

        f.manager.initialize().await;
        f.manager.wait_for_background_setup().await;

        assert_eq!(
            f.prompt.asked(),
            vec![vec![ShellDialect::Bash, ShellDialect::Zsh]]
        );
        assert_eq!(bash.setup_calls(), 1);
        assert_eq!(zsh.setup_calls(), 1);

        let vars = f.host.collection(None).snapshot();
        assert_eq!(vars.get(BASH_ACTIVATE_KEY).map(String::as_str), Some(" conda activate myenv"));
        assert_eq!(vars.get(ZSH_ACTIVATE_KEY).map(String::as_str), Some(" conda activate myenv"));

        // Hooked shells are left to their profiles, sh gets a command
        let terminals = f.host.mock_terminals();
        assert!(terminals[0].calls().is_empty());
        assert!(terminals[1].calls().is_empty());
        assert_eq!(
            terminals[3].calls(),
            vec![TerminalCall::SendText("conda activate myenv".to_string())]
        );
    }

    #[tokio::test]
    async fn test_opened_event_activates_once() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let terminal = MockTerminal::new(7, "bash", ShellDialect::Bash);
        f.host.add_terminal(terminal.clone());

        f.manager.handle_event(TerminalEvent::Opened(terminal.clone())).await;
        f.manager
            .handle_event(TerminalEvent::ShellIntegrationChanged(terminal.clone()))
            .await;

        assert_eq!(terminal.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_environment_change_switches_terminals() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let terminal = MockTerminal::new(7, "bash", ShellDialect::Bash);
        f.host.add_terminal(terminal.clone());
        f.manager.handle_event(TerminalEvent::Opened(terminal.clone())).await;

        f.resolver.set_default(Some(conda_env("next")));
        f.manager
            .handle_event(TerminalEvent::EnvironmentChanged { scope: None })
            .await;

        assert_eq!(
            terminal.calls(),
            vec![
                TerminalCall::SendText(" conda activate myenv".to_string()),
                TerminalCall::SendText(" conda deactivate".to_string()),
                TerminalCall::SendText(" conda activate next".to_string()),
            ]
        );
        assert_eq!(
            f.manager.activation().environment_for(TerminalId(7)).await,
            Some(EnvironmentId::new("conda-next"))
        );
    }

    #[tokio::test]
    async fn test_event_loop_drains_channel() {
        let f = fixture(AutoActivationType::Command, Vec::new(), true);
        let terminal = MockTerminal::new(7, "bash", ShellDialect::Bash);
        f.host.add_terminal(terminal.clone());

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(TerminalEvent::Opened(terminal.clone())).unwrap();
        tx.send(TerminalEvent::Closed(terminal.id())).unwrap();
        drop(tx);
        f.manager.clone().run_event_loop(rx).await;

        assert_eq!(terminal.calls().len(), 1);
        assert!(!f.manager.activation().is_activated(terminal.id()).await);
    }

    // ==================== Settings and teardown ====================

    #[tokio::test]
    async fn test_env_variables_follow_mode() {
        let folder = PathBuf::from("/ws");
        let host = MockHost::new(ShellDialect::Bash).with_workspace_folders(vec![folder.clone()]);
        let f = fixture_with_host(
            host,
            AutoActivationType::ShellStartup,
            vec![bash_provider(ShellSetupState::Setup)],
            true,
        );
        f.resolver.set_scoped("/ws", conda_env("ws"));

        f.manager.initialize().await;
        assert_eq!(
            f.host.collection(Some(&folder)).get(BASH_ACTIVATE_KEY).as_deref(),
            Some(" conda activate ws")
        );

        f.manager.update_settings(config(AutoActivationType::Command)).await;
        assert!(f.host.collection(Some(&folder)).snapshot().is_empty());
        assert!(f.host.collection(None).snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_revert_tears_down_and_clears_cache() {
        let bash = bash_provider(ShellSetupState::Setup);
        let f = fixture(AutoActivationType::ShellStartup, vec![bash.clone()], true);

        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::ShellStartup
        );
        f.manager.update_env_variables(None).await;
        assert!(!f.host.collection(None).snapshot().is_empty());

        let results = f.manager.revert_startup_scripts().await;
        assert_eq!(results, vec![("bash", ShellScriptEditState::Edited)]);
        assert_eq!(bash.teardown_calls(), 1);
        assert!(f.host.collection(None).snapshot().is_empty());

        // The cache was cleared, so the torn down state is seen
        assert_eq!(
            f.manager.activation_type_for(ShellDialect::Bash).await,
            AutoActivationType::Command
        );
    }

    #[tokio::test]
    async fn test_setup_status() {
        let f = fixture(
            AutoActivationType::Command,
            vec![
                bash_provider(ShellSetupState::Setup),
                zsh_provider(ShellSetupState::NotInstalled),
            ],
            true,
        );

        let status = f.manager.setup_status().await;
        let summary: Vec<_> = status.iter().map(|s| (s.shell, s.state)).collect();
        assert_eq!(
            summary,
            vec![
                ("bash", ShellSetupState::Setup),
                ("zsh", ShellSetupState::NotInstalled),
            ]
        );
        assert_eq!(status[0].env_key, BASH_ACTIVATE_KEY);

        let json = serde_json::to_value(&status[1]).unwrap();
        assert_eq!(json["state"], "not installed");
    }
}
