//! Shell command synthesis
//!
//! Turns a sequence of [`CommandStep`]s into one command line in the syntax
//! of a particular shell dialect.

use envact_host::{CommandStep, PythonEnvironment, ShellCommandMap, ShellDialect};

/// Build a single command string for `dialect` out of `steps`.
///
/// An empty step list yields an empty string, meaning "nothing to run".
pub fn build_command_string(dialect: ShellDialect, steps: &[CommandStep]) -> String {
    if steps.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = steps.iter().map(|step| join_step(dialect, step)).collect();

    let joined = if dialect.is_powershell() && parts.len() > 1 {
        parts
            .iter()
            .map(|part| format!("({})", part))
            .collect::<Vec<_>>()
            .join(" ; ")
    } else {
        parts.join(&format!(" {} ", dialect.delimiter()))
    };

    if dialect.hides_history_with_leading_space() {
        format!(" {}", joined.trim_start())
    } else {
        joined
    }
}

/// Join one step's executable and arguments, quoting where needed
fn join_step(dialect: ShellDialect, step: &CommandStep) -> String {
    std::iter::once(&step.executable)
        .chain(step.args.iter())
        .map(|part| {
            if dialect == ShellDialect::GitBash {
                quote_arg_if_needed(&to_git_bash_path(part))
            } else {
                quote_arg_if_needed(part)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap an argument containing a space in double quotes unless it already is
pub fn quote_arg_if_needed(arg: &str) -> String {
    let already_quoted = arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"');
    if arg.contains(' ') && !already_quoted {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Convert a Windows path into the form Git Bash understands:
/// `C:\Users\me` becomes `/c/Users/me`
pub fn to_git_bash_path(value: &str) -> String {
    let slashed = value.replace('\\', "/");
    let mut chars = slashed.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            format!("/{}{}", drive.to_ascii_lowercase(), chars.as_str())
        }
        _ => slashed,
    }
}

/// Dialect entry, then the `unknown` entry, then the generic list
fn resolve_steps<'a>(
    shell_map: Option<&'a ShellCommandMap>,
    generic: Option<&'a Vec<CommandStep>>,
    dialect: ShellDialect,
) -> Option<&'a [CommandStep]> {
    shell_map
        .and_then(|map| map.get(&dialect).or_else(|| map.get(&ShellDialect::Unknown)))
        .or(generic)
        .map(Vec::as_slice)
}

/// Activation steps that apply to `dialect`
pub fn shell_activation_steps(env: &PythonEnvironment, dialect: ShellDialect) -> Option<&[CommandStep]> {
    let info = &env.exec_info;
    resolve_steps(info.shell_activation.as_ref(), info.activation.as_ref(), dialect)
}

/// Deactivation steps that apply to `dialect`
pub fn shell_deactivation_steps(
    env: &PythonEnvironment,
    dialect: ShellDialect,
) -> Option<&[CommandStep]> {
    let info = &env.exec_info;
    resolve_steps(
        info.shell_deactivation.as_ref(),
        info.deactivation.as_ref(),
        dialect,
    )
}

/// Activation command line for `dialect`, `None` when the environment has none
pub fn activation_command(env: &PythonEnvironment, dialect: ShellDialect) -> Option<String> {
    shell_activation_steps(env, dialect)
        .map(|steps| build_command_string(dialect, steps))
        .filter(|cmd| !cmd.trim().is_empty())
}

/// Deactivation command line for `dialect`, `None` when the environment has none
pub fn deactivation_command(env: &PythonEnvironment, dialect: ShellDialect) -> Option<String> {
    shell_deactivation_steps(env, dialect)
        .map(|steps| build_command_string(dialect, steps))
        .filter(|cmd| !cmd.trim().is_empty())
}

/// Command line that runs the environment's interpreter directly
pub fn run_command(env: &PythonEnvironment, dialect: ShellDialect) -> String {
    let info = &env.exec_info;
    let step = info.activated_run.as_ref().unwrap_or(&info.run);
    build_command_string(dialect, std::slice::from_ref(step))
}
