//! Where shells and their profiles live on this machine

use crate::{CoreError, Result};
use envact_config::StartupConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Operating system family, decides profile locations and which shells exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

/// Paths and lookup rules shared by all startup script providers
#[derive(Debug, Clone)]
pub struct ShellContext {
    pub platform: Platform,
    pub home_dir: PathBuf,
    /// XDG style config dir (`~/.config`), used by fish and pwsh on unix
    pub xdg_config_dir: PathBuf,
    /// Platform config dir (`%APPDATA%`, `~/Library/Application Support`)
    pub app_config_dir: PathBuf,
    /// `Documents` folder, home of the Windows PowerShell profiles
    pub documents_dir: PathBuf,
    pub zdotdir: Option<PathBuf>,
    /// PATH used to locate shells; `None` means the process PATH
    pub path: Option<OsString>,
    /// Extra install roots probed on Windows (`%ProgramFiles%`, `%SystemRoot%`)
    pub program_files: Option<PathBuf>,
    pub system_root: Option<PathBuf>,
    /// Ask shells for their profile locations instead of assuming defaults
    pub probe_profiles: bool,
    /// Directory of the cmd.exe startup batch files
    pub cmd_scripts_dir: PathBuf,
}

impl ShellContext {
    /// Build a context from the process environment and settings
    pub fn from_env(config: &StartupConfig) -> Result<Self> {
        let base = directories::BaseDirs::new().ok_or(CoreError::NoHomeDir)?;
        let home_dir = base.home_dir().to_path_buf();
        let platform = Platform::current();

        let xdg_config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir.join(".config"));
        let documents_dir = directories::UserDirs::new()
            .and_then(|u| u.document_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| home_dir.join("Documents"));

        Ok(Self {
            platform,
            xdg_config_dir,
            app_config_dir: base.config_dir().to_path_buf(),
            documents_dir,
            zdotdir: std::env::var_os("ZDOTDIR").map(PathBuf::from),
            path: std::env::var_os("PATH"),
            program_files: std::env::var_os("ProgramFiles").map(PathBuf::from),
            system_root: std::env::var_os("SystemRoot").map(PathBuf::from),
            probe_profiles: config.probe_profiles,
            cmd_scripts_dir: config
                .cmd_scripts_dir()
                .unwrap_or_else(|| home_dir.join(".cmdrc")),
            home_dir,
        })
    }

    /// A self-contained context rooted at `home`, searching only `path` for
    /// shells and never spawning them
    pub fn isolated(platform: Platform, home: &Path, path: Option<OsString>) -> Self {
        Self {
            platform,
            home_dir: home.to_path_buf(),
            xdg_config_dir: home.join(".config"),
            app_config_dir: match platform {
                Platform::Linux => home.join(".config"),
                Platform::MacOs => home.join("Library").join("Application Support"),
                Platform::Windows => home.join("AppData").join("Roaming"),
            },
            documents_dir: home.join("Documents"),
            zdotdir: None,
            path,
            program_files: None,
            system_root: None,
            probe_profiles: false,
            cmd_scripts_dir: home.join(".cmdrc"),
        }
    }

    /// Locate a shell executable on PATH
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => std::env::var_os("PATH")?,
        };
        which::which_in(name, Some(path), &self.home_dir).ok()
    }

    /// Locate a shell on PATH or at one of the well-known install locations
    pub fn find_shell(&self, name: &str, known_locations: &[PathBuf]) -> Option<PathBuf> {
        self.find_executable(name)
            .or_else(|| known_locations.iter().find(|p| p.is_file()).cloned())
    }
}

/// Run a shell to ask it something (like its profile path).
///
/// Returns the trimmed first line of stdout, or `None` on any failure.
pub(crate) async fn probe_shell(executable: &Path, args: &[&str]) -> Option<String> {
    let output = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(executable)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output(),
    )
    .await;

    match output {
        Ok(Ok(out)) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            stdout
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        }
        Ok(Ok(out)) => {
            tracing::debug!(
                "{} exited with {} while probing",
                executable.display(),
                out.status
            );
            None
        }
        Ok(Err(e)) => {
            tracing::debug!("Failed to spawn {}: {}", executable.display(), e);
            None
        }
        Err(_) => {
            tracing::warn!("Timed out probing {}", executable.display());
            None
        }
    }
}
