//! Collaborators for running the activation core from a plain command line

use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Confirm};
use envact_host::{
    EnvironmentResolver, EnvironmentVariableCollection, HostError, MemoryEnvCollection,
    PythonEnvironment, SetupPrompt, ShellDialect, Terminal, TerminalHost, TerminalOptions,
};
use std::path::Path;
use std::sync::Arc;

/// Host without terminals; variables land in an in-memory collection
#[derive(Default)]
pub struct DetachedHost {
    collection: Arc<MemoryEnvCollection>,
}

#[async_trait]
impl TerminalHost for DetachedHost {
    fn terminals(&self) -> Vec<Arc<dyn Terminal>> {
        Vec::new()
    }

    async fn create_terminal(
        &self,
        _options: &TerminalOptions,
    ) -> envact_host::Result<Arc<dyn Terminal>> {
        Err(HostError::Unsupported(
            "the command line cannot open terminals".to_string(),
        ))
    }

    fn environment_collection(
        &self,
        _scope: Option<&Path>,
    ) -> Arc<dyn EnvironmentVariableCollection> {
        self.collection.clone()
    }
}

/// Resolves every scope to the environment given on the command line
pub struct FixedResolver(pub Option<PythonEnvironment>);

#[async_trait]
impl EnvironmentResolver for FixedResolver {
    async fn get_environment(&self, _scope: Option<&Path>) -> Option<PythonEnvironment> {
        self.0.clone()
    }
}

/// Asks on the terminal before profiles are edited
pub struct ConfirmPrompt {
    pub assume_yes: bool,
}

#[async_trait]
impl SetupPrompt for ConfirmPrompt {
    async fn confirm_shell_setup(&self, shells: &[ShellDialect]) -> bool {
        if self.assume_yes {
            return true;
        }

        if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            eprintln!("Non-interactive mode - pass --yes to edit shell startup scripts");
            return false;
        }

        let names: Vec<String> = shells.iter().map(ToString::to_string).collect();
        let question = format!(
            "Add environment activation to the startup scripts of {}?",
            names.join(", ")
        );
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .default(true)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                tracing::warn!("Prompt failed: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Prompt task failed: {}", e);
                false
            }
        }
    }
}
