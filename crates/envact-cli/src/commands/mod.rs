//! CLI command implementations

mod profiles;
mod synthesize;

use anyhow::{Context, Result};
use envact_host::PythonEnvironment;
use std::path::Path;

pub use profiles::*;
pub use synthesize::*;

/// Load an environment descriptor from a JSON file
fn load_env(path: &Path) -> Result<PythonEnvironment> {
    PythonEnvironment::load_from(path)
        .with_context(|| format!("Failed to load environment from {}", path.display()))
}
