//! Commands that print activation strings

use super::load_env;
use anyhow::{anyhow, bail, Context, Result};
use envact_core::startup::Platform;
use envact_core::{
    activation_command, build_command_string, deactivation_command, env_var_providers,
    run_command,
};
use envact_host::{CommandStep, ShellDialect};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Activate,
    Deactivate,
    Run,
}

/// Split `"conda activate my env"` style strings into steps
fn parse_steps(raw: &[String]) -> Result<Vec<CommandStep>> {
    raw.iter()
        .map(|step| {
            let words =
                shell_words::split(step).with_context(|| format!("Invalid step: {}", step))?;
            let (executable, args) = words
                .split_first()
                .ok_or_else(|| anyhow!("Empty step"))?;
            Ok(CommandStep::new(executable.clone(), args.iter().cloned()))
        })
        .collect()
}

/// Print the command line for `shell`
pub fn command(
    shell: ShellDialect,
    env_path: Option<&Path>,
    steps: &[String],
    kind: CommandKind,
) -> Result<()> {
    let line = match env_path {
        Some(path) => {
            let env = load_env(path)?;
            match kind {
                CommandKind::Activate => activation_command(&env, shell).ok_or_else(|| {
                    anyhow!("{} has no activation command for {}", env.label(), shell)
                })?,
                CommandKind::Deactivate => deactivation_command(&env, shell).ok_or_else(|| {
                    anyhow!("{} has no deactivation command for {}", env.label(), shell)
                })?,
                CommandKind::Run => run_command(&env, shell),
            }
        }
        None if steps.is_empty() => bail!("Either --env or --step is required"),
        None => {
            if kind != CommandKind::Activate {
                bail!("--deactivate and --run need an environment (--env)");
            }
            build_command_string(shell, &parse_steps(steps)?)
        }
    };

    println!("{}", line);
    Ok(())
}

/// Print the variables the startup hooks would evaluate for an environment
pub fn env(env_path: &Path, json: bool) -> Result<()> {
    let env = load_env(env_path)?;
    let mut vars: BTreeMap<String, Option<String>> = BTreeMap::new();
    for provider in env_var_providers(Platform::current()) {
        vars.extend(provider.get_env_variables(Some(&env)));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&vars)?);
        return Ok(());
    }

    for (key, value) in &vars {
        match value {
            Some(value) => println!("{}={}", key, shell_words::quote(value)),
            None => println!("# {} (not set)", key),
        }
    }
    Ok(())
}
