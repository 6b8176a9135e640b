//! In-memory environment variable collection

use crate::EnvironmentVariableCollection;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Collection backed by a map, with a write counter so callers can tell
/// whether an update actually touched the collection
#[derive(Debug, Default)]
pub struct MemoryEnvCollection {
    vars: Mutex<BTreeMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryEnvCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all variables
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Number of `replace`/`delete` calls that changed something
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or_default()
    }

    fn bump(&self) {
        if let Ok(mut w) = self.writes.lock() {
            *w += 1;
        }
    }
}

impl EnvironmentVariableCollection for MemoryEnvCollection {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().ok()?.get(key).cloned()
    }

    fn replace(&self, key: &str, value: &str) {
        if let Ok(mut vars) = self.vars.lock() {
            vars.insert(key.to_string(), value.to_string());
        }
        self.bump();
    }

    fn delete(&self, key: &str) {
        let removed = self
            .vars
            .lock()
            .map(|mut vars| vars.remove(key).is_some())
            .unwrap_or(false);
        if removed {
            self.bump();
        }
    }
}
