//! Marker-delimited regions inside shell profile files
//!
//! A region is everything between a start and an end sentinel line,
//! inclusive. Nothing else in a profile is ever parsed or rewritten.

use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Compiled patterns, one per marker pair
static PATTERNS: OnceLock<Mutex<HashMap<MarkerRegion, Regex>>> = OnceLock::new();

/// Start/end sentinel lines in a dialect's comment syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerRegion {
    pub start: &'static str,
    pub end: &'static str,
}

impl MarkerRegion {
    /// `#` comments: bash, zsh, fish, nu
    pub const HASH: MarkerRegion = MarkerRegion {
        start: "# >>> vscode python",
        end: "# <<< vscode python",
    };

    /// PowerShell folding regions
    pub const POWERSHELL: MarkerRegion = MarkerRegion {
        start: "#region vscode python",
        end: "#endregion vscode python",
    };

    /// Batch file comments
    pub const BATCH: MarkerRegion = MarkerRegion {
        start: ":: >>> vscode python",
        end: ":: <<< vscode python",
    };

    fn pattern(&self) -> Regex {
        let mut patterns = PATTERNS
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        patterns
            .entry(*self)
            .or_insert_with(|| {
                let pattern = format!(
                    r"(?sm)^[ \t]*{}.*?{}[ \t]*(?:\r?\n|\z)",
                    regex::escape(self.start),
                    regex::escape(self.end)
                );
                Regex::new(&pattern).expect("escaped marker pattern is a valid regex")
            })
            .clone()
    }

    /// The first region in `content`, including its trailing line ending
    pub fn find<'a>(&self, content: &'a str) -> Option<&'a str> {
        self.pattern().find(content).map(|m| m.as_str())
    }

    /// Whether a region exists and mentions `key`
    pub fn contains_key(&self, content: &str, key: &str) -> bool {
        self.find(content).is_some_and(|region| region.contains(key))
    }

    /// Wrap `body` in the sentinels using `eol` line endings
    pub fn wrap(&self, body: &str, eol: &str) -> String {
        let mut out = String::new();
        out.push_str(self.start);
        out.push_str(eol);
        for line in body.lines() {
            out.push_str(line);
            out.push_str(eol);
        }
        out.push_str(self.end);
        out.push_str(eol);
        out
    }

    /// Append a fresh region holding `body`, replacing any existing one
    pub fn insert(&self, content: &str, body: &str) -> String {
        let base = self.remove(content).unwrap_or_else(|| content.to_string());
        let eol = line_ending(&base);
        let block = self.wrap(body, eol);

        if base.is_empty() {
            block
        } else if base.ends_with('\n') {
            format!("{}{}", base, block)
        } else {
            format!("{}{}{}", base, eol, block)
        }
    }

    /// Remove every region, or `None` when there is nothing to remove
    pub fn remove(&self, content: &str) -> Option<String> {
        let pattern = self.pattern();
        if !pattern.is_match(content) {
            return None;
        }
        Some(pattern.replace_all(content, "").into_owned())
    }
}

/// Line ending convention already used by `content` (`\n` when unknown)
pub fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Outcome of stripping a region from a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRemoval {
    /// File or region absent, nothing changed
    NotPresent,
    /// Region removed, rest of the file kept
    Removed,
    /// Region was all that remained, file deleted
    FileDeleted,
}

/// Read a profile, treating a missing file as `None`
pub(crate) async fn read_profile(path: &Path) -> std::io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// The file a profile path really names: symlinks are followed so that
/// dotfile-manager links keep pointing at the edited file
async fn resolve_profile(path: &Path) -> std::io::Result<PathBuf> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => match tokio::fs::canonicalize(path).await {
            Ok(target) => Ok(target),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Dangling link; write where it points
                let target = tokio::fs::read_link(path).await?;
                Ok(match path.parent() {
                    Some(parent) if target.is_relative() => parent.join(target),
                    _ => target,
                })
            }
            Err(e) => Err(e),
        },
        _ => Ok(path.to_path_buf()),
    }
}

/// Write a profile atomically, creating its parent directory.
///
/// Writes to a temporary file in the same directory as the real file, then
/// renames it over the target so a crash never leaves a half-written
/// profile. The existing file's permissions are kept.
pub(crate) async fn write_profile(path: &Path, content: String) -> std::io::Result<()> {
    let target = resolve_profile(path).await?;
    tokio::task::spawn_blocking(move || {
        let parent = target.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;
        let permissions = match std::fs::metadata(&target) {
            Ok(meta) => Some(meta.permissions()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        match permissions {
            Some(permissions) => tmp.as_file().set_permissions(permissions)?,
            None => set_new_file_permissions(tmp.as_file())?,
        }
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(unix)]
fn set_new_file_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_new_file_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Whether the file at `path` holds a region mentioning `key`
pub(crate) async fn has_region_with_key(
    path: &Path,
    region: MarkerRegion,
    key: &str,
) -> std::io::Result<bool> {
    Ok(read_profile(path)
        .await?
        .is_some_and(|content| region.contains_key(&content, key)))
}

/// Make sure the file at `path` holds exactly one region mentioning `key`.
///
/// Returns `true` when the file was written.
pub(crate) async fn ensure_region(
    path: &Path,
    region: MarkerRegion,
    key: &str,
    body: &str,
) -> std::io::Result<bool> {
    let content = read_profile(path).await?.unwrap_or_default();
    if region.contains_key(&content, key) {
        tracing::debug!("{} already contains activation for {}", path.display(), key);
        return Ok(false);
    }

    write_profile(path, region.insert(&content, body)).await?;
    tracing::info!("Added activation for {} to {}", key, path.display());
    Ok(true)
}

/// Strip the region from the file at `path`, deleting the file if that
/// leaves nothing but line endings. A symlinked profile is emptied instead,
/// so the link and its target both survive.
pub(crate) async fn strip_region(path: &Path, region: MarkerRegion) -> std::io::Result<RegionRemoval> {
    let Some(content) = read_profile(path).await? else {
        return Ok(RegionRemoval::NotPresent);
    };
    let Some(stripped) = region.remove(&content) else {
        return Ok(RegionRemoval::NotPresent);
    };

    let is_link = tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.file_type().is_symlink());
    if !is_link && stripped.chars().all(|c| c == '\r' || c == '\n') {
        tokio::fs::remove_file(path).await?;
        tracing::info!("Removed {} (only contained activation)", path.display());
        return Ok(RegionRemoval::FileDeleted);
    }

    write_profile(path, stripped).await?;
    tracing::info!("Removed activation from {}", path.display());
    Ok(RegionRemoval::Removed)
}
