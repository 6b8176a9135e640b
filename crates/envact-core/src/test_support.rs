//! Test support utilities for envact-core
//!
//! Mock terminals, hosts, resolvers and prompts for driving the activation
//! state machine and the TerminalManager without a real editor, plus helpers
//! that build a throwaway home directory with fake shells on PATH.

use crate::startup::{
    AutoRunRegistry, Platform, ShellContext, ShellScriptEditState, ShellSetupState,
    ShellStartupScriptProvider,
};
use crate::{CoreError, Result};
use async_trait::async_trait;
use envact_host::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Records what was done to a mock terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCall {
    SendText(String),
    Execute(String),
    Show,
}

/// Configurable terminal handle
pub struct MockTerminal {
    id: TerminalId,
    name: String,
    dialect: ShellDialect,
    cwd: Mutex<Option<PathBuf>>,
    shell_integration: AtomicBool,
    exit_code: Mutex<Option<i32>>,
    /// How long `execute_command` takes
    delay: Mutex<Duration>,
    calls: Mutex<Vec<TerminalCall>>,
}

impl MockTerminal {
    pub fn new(id: u64, name: &str, dialect: ShellDialect) -> Arc<Self> {
        Arc::new(Self {
            id: TerminalId(id),
            name: name.to_string(),
            dialect,
            cwd: Mutex::new(None),
            shell_integration: AtomicBool::new(false),
            exit_code: Mutex::new(Some(0)),
            delay: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_shell_integration(self: Arc<Self>) -> Arc<Self> {
        self.set_shell_integration(true);
        self
    }

    pub fn with_exit_code(self: Arc<Self>, code: i32) -> Arc<Self> {
        *self.exit_code.lock().unwrap() = Some(code);
        self
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn with_cwd(self: Arc<Self>, cwd: impl Into<PathBuf>) -> Arc<Self> {
        *self.cwd.lock().unwrap() = Some(cwd.into());
        self
    }

    pub fn set_shell_integration(&self, available: bool) {
        self.shell_integration.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TerminalCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TerminalCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Terminal for MockTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn shell_dialect(&self) -> ShellDialect {
        self.dialect
    }

    fn has_shell_integration(&self) -> bool {
        self.shell_integration.load(Ordering::SeqCst)
    }

    fn cwd(&self) -> Option<PathBuf> {
        self.cwd.lock().unwrap().clone()
    }

    fn send_text(&self, text: &str) {
        self.record(TerminalCall::SendText(text.to_string()));
    }

    async fn execute_command(&self, command: &str) -> envact_host::Result<Option<i32>> {
        self.record(TerminalCall::Execute(command.to_string()));
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(*self.exit_code.lock().unwrap())
    }

    fn show(&self) {
        self.record(TerminalCall::Show);
    }
}

/// Host holding mock terminals and in-memory environment collections
pub struct MockHost {
    terminals: Mutex<Vec<Arc<MockTerminal>>>,
    next_id: AtomicU64,
    /// Dialect of terminals created through `create_terminal`
    new_dialect: ShellDialect,
    collections: Mutex<HashMap<Option<PathBuf>, Arc<MemoryEnvCollection>>>,
    folders: Vec<PathBuf>,
    created: Mutex<Vec<TerminalOptions>>,
    /// How long `create_terminal` takes
    create_delay: Duration,
}

impl MockHost {
    pub fn new(new_dialect: ShellDialect) -> Self {
        Self {
            terminals: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            new_dialect,
            collections: Mutex::new(HashMap::new()),
            folders: Vec::new(),
            created: Mutex::new(Vec::new()),
            create_delay: Duration::ZERO,
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn with_workspace_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.folders = folders;
        self
    }

    pub fn add_terminal(&self, terminal: Arc<MockTerminal>) {
        self.terminals.lock().unwrap().push(terminal);
    }

    pub fn close(&self, id: TerminalId) {
        self.terminals.lock().unwrap().retain(|t| t.id() != id);
    }

    pub fn mock_terminals(&self) -> Vec<Arc<MockTerminal>> {
        self.terminals.lock().unwrap().clone()
    }

    /// Options of every terminal created so far
    pub fn created(&self) -> Vec<TerminalOptions> {
        self.created.lock().unwrap().clone()
    }

    pub fn collection(&self, scope: Option<&Path>) -> Arc<MemoryEnvCollection> {
        self.collections
            .lock()
            .unwrap()
            .entry(scope.map(Path::to_path_buf))
            .or_default()
            .clone()
    }
}

#[async_trait]
impl TerminalHost for MockHost {
    fn terminals(&self) -> Vec<Arc<dyn Terminal>> {
        self.terminals
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.clone() as Arc<dyn Terminal>)
            .collect()
    }

    async fn create_terminal(&self, options: &TerminalOptions) -> envact_host::Result<Arc<dyn Terminal>> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = options.name.clone().unwrap_or_else(|| "Python".to_string());
        let terminal = MockTerminal::new(id, &name, self.new_dialect);
        if let Some(cwd) = &options.cwd {
            *terminal.cwd.lock().unwrap() = Some(cwd.clone());
        }
        self.created.lock().unwrap().push(options.clone());
        self.add_terminal(terminal.clone());
        Ok(terminal as Arc<dyn Terminal>)
    }

    fn environment_collection(&self, scope: Option<&Path>) -> Arc<dyn EnvironmentVariableCollection> {
        self.collection(scope)
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }
}

/// Resolver with a default environment and per-folder overrides
#[derive(Default)]
pub struct MockResolver {
    default: Mutex<Option<PythonEnvironment>>,
    scoped: Mutex<Vec<(PathBuf, PythonEnvironment)>>,
}

impl MockResolver {
    pub fn new(default: Option<PythonEnvironment>) -> Self {
        Self {
            default: Mutex::new(default),
            scoped: Mutex::new(Vec::new()),
        }
    }

    pub fn set_default(&self, env: Option<PythonEnvironment>) {
        *self.default.lock().unwrap() = env;
    }

    pub fn set_scoped(&self, folder: impl Into<PathBuf>, env: PythonEnvironment) {
        self.scoped.lock().unwrap().push((folder.into(), env));
    }
}

#[async_trait]
impl EnvironmentResolver for MockResolver {
    async fn get_environment(&self, scope: Option<&Path>) -> Option<PythonEnvironment> {
        if let Some(scope) = scope {
            let scoped = self.scoped.lock().unwrap();
            if let Some((_, env)) = scoped.iter().find(|(folder, _)| scope.starts_with(folder)) {
                return Some(env.clone());
            }
        }
        self.default.lock().unwrap().clone()
    }
}

/// Consent prompt with a fixed answer that remembers what it was asked
pub struct MockPrompt {
    answer: bool,
    asked: Mutex<Vec<Vec<ShellDialect>>>,
}

impl MockPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<Vec<ShellDialect>> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl SetupPrompt for MockPrompt {
    async fn confirm_shell_setup(&self, shells: &[ShellDialect]) -> bool {
        self.asked.lock().unwrap().push(shells.to_vec());
        self.answer
    }
}

/// In-memory `AutoRun` value
#[derive(Default)]
pub struct MockRegistry {
    value: Mutex<Option<String>>,
    writes: AtomicUsize,
    fail: bool,
}

impl MockRegistry {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
            ..Self::default()
        }
    }

    /// Registry whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutoRunRegistry for MockRegistry {
    async fn get_auto_run(&self) -> Option<String> {
        self.value()
    }

    async fn set_auto_run(&self, value: &str) -> Result<()> {
        if self.fail {
            return Err(CoreError::Registry("access denied".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap() = Some(value.to_string());
        Ok(())
    }
}

/// Startup provider with scripted answers
pub struct MockStartupProvider {
    name: &'static str,
    dialects: &'static [ShellDialect],
    state: Mutex<ShellSetupState>,
    setup_result: ShellScriptEditState,
    setup_calls: AtomicUsize,
    teardown_calls: AtomicUsize,
}

impl MockStartupProvider {
    pub fn new(name: &'static str, dialects: &'static [ShellDialect], state: ShellSetupState) -> Self {
        Self {
            name,
            dialects,
            state: Mutex::new(state),
            setup_result: ShellScriptEditState::Edited,
            setup_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
        }
    }

    /// Setup reports `result` and leaves the state unchanged unless Edited
    pub fn with_setup_result(mut self, result: ShellScriptEditState) -> Self {
        self.setup_result = result;
        self
    }

    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }

    pub fn teardown_calls(&self) -> usize {
        self.teardown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShellStartupScriptProvider for MockStartupProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        self.dialects
    }

    fn env_key(&self) -> &'static str {
        crate::env_key_for(self.dialects[0]).unwrap_or("VSCODE_MOCK_ACTIVATE")
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn is_setup(&self) -> ShellSetupState {
        *self.state.lock().unwrap()
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        if self.setup_result == ShellScriptEditState::Edited {
            *self.state.lock().unwrap() = ShellSetupState::Setup;
        }
        self.setup_result
    }

    async fn teardown_scripts(&self) -> ShellScriptEditState {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if *state == ShellSetupState::Setup {
            *state = ShellSetupState::NotSetup;
        }
        ShellScriptEditState::Edited
    }
}

/// A fake home directory with executables named `shells` on its PATH
pub fn isolated_context(platform: Platform, shells: &[&str]) -> (TempDir, Arc<ShellContext>) {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    for shell in shells {
        let exe = bin.join(shell);
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
    let ctx = ShellContext::isolated(platform, tmp.path(), Some(bin.into_os_string()));
    (tmp, Arc::new(ctx))
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Environment whose generic activation is `activation`
pub fn python_env(id: &str, activation: Vec<CommandStep>) -> PythonEnvironment {
    let mut exec_info = ExecInfo::new(CommandStep::new("python", Vec::<String>::new()));
    if !activation.is_empty() {
        exec_info.activation = Some(activation);
    }
    PythonEnvironment::new(id, id, exec_info)
}

/// A conda environment named `name` (id `conda-<name>`)
pub fn conda_env(name: &str) -> PythonEnvironment {
    let mut exec_info = ExecInfo::new(CommandStep::new("conda", ["run", "-n", name, "python"]));
    exec_info.activation = Some(vec![CommandStep::new("conda", ["activate", name])]);
    exec_info.deactivation = Some(vec![CommandStep::new("conda", ["deactivate"])]);
    PythonEnvironment::new(format!("conda-{}", name), name, exec_info)
}
