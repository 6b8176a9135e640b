//! cmd.exe startup hook
//!
//! cmd has no profile file. It runs the registry `AutoRun` command instead,
//! so the hook is a chain of three pieces:
//!
//! 1. the activation snippet `vscode-python.bat`, holding the marker region
//! 2. the main batch file `cmd_startup.bat`, which keeps whatever `AutoRun`
//!    did before and calls the snippet once per process tree
//! 3. `AutoRun` itself, pointing at the main batch file

use super::region::{read_profile, write_profile};
use super::{
    AutoRunRegistry, MarkerRegion, ShellContext, ShellScriptEditState, ShellSetupState,
    ShellStartupScriptProvider,
};
use crate::CMD_ACTIVATE_KEY;
use async_trait::async_trait;
use envact_host::ShellDialect;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SNIPPET_FILE: &str = "vscode-python.bat";
const MAIN_FILE: &str = "cmd_startup.bat";
const GUARD_VAR: &str = "VSCODE_PYTHON_AUTOACTIVATE_GUARD";
const EOL: &str = "\r\n";

pub struct CmdStartupProvider {
    ctx: Arc<ShellContext>,
    registry: Arc<dyn AutoRunRegistry>,
}

impl CmdStartupProvider {
    pub fn new(ctx: Arc<ShellContext>, registry: Arc<dyn AutoRunRegistry>) -> Self {
        Self { ctx, registry }
    }

    fn is_installed(&self) -> bool {
        let known: Vec<PathBuf> = self
            .ctx
            .system_root
            .iter()
            .map(|root| root.join("System32").join("cmd.exe"))
            .collect();
        self.ctx.find_shell("cmd", &known).is_some()
    }

    pub fn snippet_path(&self) -> PathBuf {
        self.ctx.cmd_scripts_dir.join(SNIPPET_FILE)
    }

    pub fn main_path(&self) -> PathBuf {
        self.ctx.cmd_scripts_dir.join(MAIN_FILE)
    }

    fn snippet_body(&self) -> String {
        format!(
            "if defined {key} (\n    call %{key}%\n)",
            key = self.env_key()
        )
    }

    /// The command stored in `AutoRun`
    fn auto_run_command(&self) -> String {
        let main = self.main_path();
        format!("if exist \"{0}\" call \"{0}\"", main.display())
    }

    /// Guarded call of the snippet, run at most once per cmd process tree
    fn guarded_call(&self) -> String {
        let snippet = self.snippet_path();
        [
            format!("if not defined {} (", GUARD_VAR),
            format!("    set \"{}=1\"", GUARD_VAR),
            format!("    if exist \"{0}\" call \"{0}\"", snippet.display()),
            ")".to_string(),
        ]
        .join(EOL)
    }

    /// Fresh main batch file, keeping a foreign `AutoRun` command alive
    fn main_contents(&self, previous: Option<&str>) -> String {
        let mut lines = vec!["@echo off".to_string()];
        if let Some(previous) = previous {
            lines.push(previous.to_string());
        }
        lines.push(self.guarded_call());
        let mut content = lines.join(EOL);
        content.push_str(EOL);
        content
    }

    fn points_at_main(&self, auto_run: &str) -> bool {
        auto_run.contains(&self.main_path().display().to_string())
    }

    fn calls_snippet(&self, main: &str) -> bool {
        main.contains(&self.snippet_path().display().to_string())
    }

    async fn snippet_is_setup(&self) -> bool {
        match read_profile(&self.snippet_path()).await {
            Ok(content) => content
                .is_some_and(|c| MarkerRegion::BATCH.contains_key(&c, self.env_key())),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.snippet_path().display(), e);
                false
            }
        }
    }

    async fn main_is_setup(&self) -> bool {
        match read_profile(&self.main_path()).await {
            Ok(content) => content.is_some_and(|c| self.calls_snippet(&c)),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.main_path().display(), e);
                false
            }
        }
    }

    async fn write_snippet(&self, path: &Path) -> std::io::Result<()> {
        let content = read_profile(path).await?.unwrap_or_default();
        if MarkerRegion::BATCH.contains_key(&content, self.env_key()) {
            tracing::debug!("{} already contains activation", path.display());
            return Ok(());
        }

        let body = self.snippet_body();
        let updated = if content.is_empty() {
            MarkerRegion::BATCH.wrap(&body, EOL)
        } else {
            MarkerRegion::BATCH.insert(&content, &body)
        };
        write_profile(path, updated).await?;
        tracing::info!("Wrote cmd activation snippet {}", path.display());
        Ok(())
    }

    /// Make the main batch file call the snippet and run `previous` (a
    /// foreign `AutoRun` command) ahead of the guarded call
    async fn write_main(&self, path: &Path, previous: Option<&str>) -> std::io::Result<()> {
        let foreign = previous.filter(|p| !self.points_at_main(p));
        let Some(content) = read_profile(path).await? else {
            write_profile(path, self.main_contents(foreign)).await?;
            tracing::info!("Wrote cmd startup file {}", path.display());
            return Ok(());
        };

        let missing = foreign.filter(|p| !content.lines().any(|line| line.trim() == p.trim()));
        let calls_snippet = self.calls_snippet(&content);
        if calls_snippet && missing.is_none() {
            tracing::debug!("{} already calls the snippet", path.display());
            return Ok(());
        }

        let eol = super::line_ending(&content);
        let mut updated = content.clone();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push_str(eol);
        }
        if let Some(previous) = missing {
            let guard = format!("if not defined {} (", GUARD_VAR);
            match updated.find(&guard) {
                Some(at) => updated.insert_str(at, &format!("{}{}", previous, eol)),
                None => {
                    updated.push_str(previous);
                    updated.push_str(eol);
                }
            }
            tracing::info!("Chained previous AutoRun command into {}", path.display());
        }
        if !calls_snippet {
            updated.push_str(&self.guarded_call().replace(EOL, eol));
            updated.push_str(eol);
        }

        write_profile(path, updated).await?;
        tracing::info!("Wrote cmd startup file {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ShellStartupScriptProvider for CmdStartupProvider {
    fn name(&self) -> &'static str {
        "cmd"
    }

    fn dialects(&self) -> &'static [ShellDialect] {
        &[ShellDialect::Cmd]
    }

    fn env_key(&self) -> &'static str {
        CMD_ACTIVATE_KEY
    }

    async fn profile_paths(&self) -> Vec<PathBuf> {
        vec![self.snippet_path(), self.main_path()]
    }

    async fn is_setup(&self) -> ShellSetupState {
        if !self.is_installed() {
            return ShellSetupState::NotInstalled;
        }

        let snippet = self.snippet_is_setup().await;
        let main = self.main_is_setup().await;
        let auto_run = self
            .registry
            .get_auto_run()
            .await
            .is_some_and(|value| self.points_at_main(&value));
        tracing::debug!(
            "cmd setup: snippet={} main={} autorun={}",
            snippet,
            main,
            auto_run
        );

        if snippet && main && auto_run {
            ShellSetupState::Setup
        } else {
            ShellSetupState::NotSetup
        }
    }

    async fn setup_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }

        let snippet = self.snippet_path();
        if let Err(e) = self.write_snippet(&snippet).await {
            tracing::warn!("Failed to write {}: {}", snippet.display(), e);
            return ShellScriptEditState::NotEdited;
        }

        let previous = self.registry.get_auto_run().await;
        let main = self.main_path();
        if let Err(e) = self.write_main(&main, previous.as_deref()).await {
            tracing::warn!("Failed to write {}: {}", main.display(), e);
            return ShellScriptEditState::NotEdited;
        }

        if previous.as_deref().is_some_and(|p| self.points_at_main(p)) {
            return ShellScriptEditState::Edited;
        }
        match self.registry.set_auto_run(&self.auto_run_command()).await {
            Ok(()) => ShellScriptEditState::Edited,
            Err(e) => {
                tracing::warn!("Failed to update AutoRun: {}", e);
                ShellScriptEditState::NotEdited
            }
        }
    }

    /// Only the snippet is touched; the main batch file and `AutoRun` may
    /// carry commands that are not ours
    async fn teardown_scripts(&self) -> ShellScriptEditState {
        if !self.is_installed() {
            return ShellScriptEditState::NotInstalled;
        }
        super::teardown_profiles(&[self.snippet_path()], MarkerRegion::BATCH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::Platform;
    use crate::test_support::{isolated_context, read, MockRegistry};

    fn provider(ctx: Arc<ShellContext>, registry: Arc<MockRegistry>) -> CmdStartupProvider {
        CmdStartupProvider::new(ctx, registry)
    }

    #[tokio::test]
    async fn test_setup_writes_all_three_pieces() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let registry = Arc::new(MockRegistry::default());
        let cmd = provider(ctx, registry.clone());

        assert_eq!(cmd.is_setup().await, ShellSetupState::NotSetup);
        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(cmd.is_setup().await, ShellSetupState::Setup);

        let snippet = read(&tmp.path().join(".cmdrc").join(SNIPPET_FILE));
        assert!(snippet.starts_with(":: >>> vscode python\r\n"));
        assert!(snippet.contains("call %VSCODE_CMD_ACTIVATE%"));

        let main = read(&tmp.path().join(".cmdrc").join(MAIN_FILE));
        assert!(main.starts_with("@echo off\r\n"));
        assert!(main.contains("if not defined VSCODE_PYTHON_AUTOACTIVATE_GUARD ("));
        assert!(main.contains(SNIPPET_FILE));

        let auto_run = registry.value().unwrap();
        assert!(auto_run.starts_with("if exist \""));
        assert!(auto_run.contains(MAIN_FILE));
    }

    #[tokio::test]
    async fn test_setup_chains_previous_auto_run() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let registry = Arc::new(MockRegistry::with_value("doskey /macrofile=aliases.txt"));
        let cmd = provider(ctx, registry.clone());

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        let main = read(&tmp.path().join(".cmdrc").join(MAIN_FILE));
        assert_eq!(
            main.lines().take(2).collect::<Vec<_>>(),
            vec!["@echo off", "doskey /macrofile=aliases.txt"]
        );

        // A second setup neither duplicates the chain nor rewrites AutoRun
        let writes = registry.write_count();
        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(registry.write_count(), writes);
        let again = read(&tmp.path().join(".cmdrc").join(MAIN_FILE));
        assert_eq!(main, again);
        assert_eq!(again.matches("doskey").count(), 1);
    }

    #[tokio::test]
    async fn test_resetup_keeps_auto_run_replaced_after_teardown() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let registry = Arc::new(MockRegistry::default());
        let cmd = provider(ctx, registry.clone());
        let main_path = tmp.path().join(".cmdrc").join(MAIN_FILE);

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(cmd.teardown_scripts().await, ShellScriptEditState::Edited);

        // Another tool takes over AutoRun while our main file stays behind
        registry
            .set_auto_run("doskey /macrofile=aliases.txt")
            .await
            .unwrap();

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(cmd.is_setup().await, ShellSetupState::Setup);
        assert!(registry.value().unwrap().contains(MAIN_FILE));

        let main = read(&main_path);
        assert_eq!(main.matches("doskey /macrofile=aliases.txt").count(), 1);
        let doskey = main.find("doskey").unwrap();
        let guard = main.find("if not defined VSCODE_PYTHON_AUTOACTIVATE_GUARD").unwrap();
        assert!(doskey < guard);
        assert_eq!(main.matches(SNIPPET_FILE).count(), 1);

        // Nothing left to chain on the next run
        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        assert_eq!(read(&main_path), main);
    }

    #[tokio::test]
    async fn test_setup_chains_auto_run_into_existing_main_file() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let main_path = tmp.path().join(".cmdrc").join(MAIN_FILE);
        std::fs::create_dir_all(main_path.parent().unwrap()).unwrap();
        std::fs::write(&main_path, "@echo off\r\nset FOO=bar\r\n").unwrap();
        let cmd = provider(ctx, Arc::new(MockRegistry::with_value("prompt $G")));

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        let main = read(&main_path);
        assert!(main.starts_with("@echo off\r\nset FOO=bar\r\nprompt $G\r\nif not defined"));
    }

    #[tokio::test]
    async fn test_setup_appends_to_existing_main_file() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let main_path = tmp.path().join(".cmdrc").join(MAIN_FILE);
        std::fs::create_dir_all(main_path.parent().unwrap()).unwrap();
        std::fs::write(&main_path, "@echo off\r\nset FOO=bar").unwrap();
        let cmd = provider(ctx, Arc::new(MockRegistry::default()));

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::Edited);
        let main = read(&main_path);
        assert!(main.starts_with("@echo off\r\nset FOO=bar\r\nif not defined"));
    }

    #[tokio::test]
    async fn test_registry_failure_is_not_edited() {
        let (_tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let cmd = provider(ctx, Arc::new(MockRegistry::failing()));

        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::NotEdited);
        assert_eq!(cmd.is_setup().await, ShellSetupState::NotSetup);
    }

    #[tokio::test]
    async fn test_teardown_only_removes_snippet() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &["cmd"]);
        let registry = Arc::new(MockRegistry::default());
        let cmd = provider(ctx, registry.clone());
        cmd.setup_scripts().await;

        let main_path = tmp.path().join(".cmdrc").join(MAIN_FILE);
        let main_before = read(&main_path);
        let auto_run_before = registry.value();

        assert_eq!(cmd.teardown_scripts().await, ShellScriptEditState::Edited);
        assert!(!tmp.path().join(".cmdrc").join(SNIPPET_FILE).exists());
        assert_eq!(read(&main_path), main_before);
        assert_eq!(registry.value(), auto_run_before);
        assert_eq!(cmd.is_setup().await, ShellSetupState::NotSetup);
    }

    #[tokio::test]
    async fn test_not_installed() {
        let (tmp, ctx) = isolated_context(Platform::Windows, &[]);
        let registry = Arc::new(MockRegistry::default());
        let cmd = provider(ctx, registry.clone());

        assert_eq!(cmd.is_setup().await, ShellSetupState::NotInstalled);
        assert_eq!(cmd.setup_scripts().await, ShellScriptEditState::NotInstalled);
        assert!(!tmp.path().join(".cmdrc").exists());
        assert_eq!(registry.write_count(), 0);
    }
}
