//! Access to the cmd.exe `AutoRun` registry value

use crate::{CoreError, Result};
use async_trait::async_trait;

const COMMAND_PROCESSOR_KEY: &str = r"HKCU\Software\Microsoft\Command Processor";
const AUTORUN_VALUE: &str = "AutoRun";

/// Reads and writes `HKCU\Software\Microsoft\Command Processor\AutoRun`
#[async_trait]
pub trait AutoRunRegistry: Send + Sync {
    /// Current value; any failure reads as "not set"
    async fn get_auto_run(&self) -> Option<String>;

    async fn set_auto_run(&self, value: &str) -> Result<()>;
}

/// Registry access through the `reg` command line tool
#[derive(Debug, Default, Clone)]
pub struct RegCommandRegistry;

#[async_trait]
impl AutoRunRegistry for RegCommandRegistry {
    async fn get_auto_run(&self) -> Option<String> {
        let output = tokio::process::Command::new("reg")
            .args(["query", COMMAND_PROCESSOR_KEY, "/v", AUTORUN_VALUE])
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                parse_reg_query_output(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(_) => {
                tracing::debug!("AutoRun is not set");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to query AutoRun: {}", e);
                None
            }
        }
    }

    async fn set_auto_run(&self, value: &str) -> Result<()> {
        let output = tokio::process::Command::new("reg")
            .args([
                "add",
                COMMAND_PROCESSOR_KEY,
                "/v",
                AUTORUN_VALUE,
                "/t",
                "REG_EXPAND_SZ",
                "/d",
                value,
                "/f",
            ])
            .output()
            .await
            .map_err(|e| CoreError::Registry(format!("failed to run reg add: {}", e)))?;

        if !output.status.success() {
            return Err(CoreError::Registry(format!(
                "reg add exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!("Set AutoRun to {}", value);
        Ok(())
    }
}

/// Extract the AutoRun data from `reg query` output like
///
/// ```text
/// HKEY_CURRENT_USER\Software\Microsoft\Command Processor
///     AutoRun    REG_SZ    doskey /macrofile=aliases.txt
/// ```
pub fn parse_reg_query_output(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(AUTORUN_VALUE)?;
        let rest = rest.trim_start();
        let data = rest
            .strip_prefix("REG_EXPAND_SZ")
            .or_else(|| rest.strip_prefix("REG_SZ"))?;
        let data = data.trim();
        (!data.is_empty()).then(|| data.to_string())
    })
}
