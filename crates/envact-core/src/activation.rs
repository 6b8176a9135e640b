//! Per-terminal activation state machine
//!
//! A terminal is either not activated, or activated with exactly one
//! environment. Calls on the same terminal are serialized, so a second
//! `activate` racing the first waits for it and then finds nothing to do.

use crate::command::{activation_command, deactivation_command};
use chrono::{DateTime, Utc};
use envact_host::{EnvironmentId, PythonEnvironment, Terminal, TerminalId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};

const SHELL_INTEGRATION_POLL: Duration = Duration::from_millis(50);
const EVENT_CAPACITY: usize = 64;

/// What is known about an activated terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationRecord {
    pub environment: EnvironmentId,
    pub activated: bool,
    pub activated_at: DateTime<Utc>,
}

/// Broadcast whenever a terminal is activated or deactivated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationChangeEvent {
    pub terminal: TerminalId,
    pub environment: EnvironmentId,
    pub activated: bool,
}

struct Entry {
    record: ActivationRecord,
    /// Kept to deactivate with the same environment's commands later
    environment: PythonEnvironment,
}

/// Serializes work on one terminal
#[derive(Default)]
struct TerminalLock {
    serial: Mutex<()>,
    /// Set once the terminal closes; a pending activation must not record
    closed: AtomicBool,
}

/// Runs activation and deactivation commands in terminals
pub struct TerminalActivation {
    entries: RwLock<HashMap<TerminalId, Entry>>,
    locks: Mutex<HashMap<TerminalId, Arc<TerminalLock>>>,
    events: broadcast::Sender<ActivationChangeEvent>,
    shell_integration_timeout: Duration,
}

/// Task terminals run build/test commands and are never activated
pub fn is_task_terminal(terminal: &dyn Terminal) -> bool {
    terminal.name().to_lowercase().contains("task")
}

impl TerminalActivation {
    pub fn new(shell_integration_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            events,
            shell_integration_timeout,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivationChangeEvent> {
        self.events.subscribe()
    }

    pub async fn is_activated(&self, id: TerminalId) -> bool {
        self.entries
            .read()
            .await
            .get(&id)
            .is_some_and(|e| e.record.activated)
    }

    pub async fn environment_for(&self, id: TerminalId) -> Option<EnvironmentId> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|e| e.record.environment.clone())
    }

    pub async fn state(&self, id: TerminalId) -> Option<ActivationRecord> {
        self.entries.read().await.get(&id).map(|e| e.record.clone())
    }

    /// Number of terminals currently holding a record
    pub async fn activated_count(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn lock_for(&self, id: TerminalId) -> Arc<TerminalLock> {
        self.locks.lock().await.entry(id).or_default().clone()
    }

    /// Activate `env` in `terminal`, replacing a different active environment
    pub async fn activate(&self, terminal: &Arc<dyn Terminal>, env: &PythonEnvironment) {
        if is_task_terminal(terminal.as_ref()) {
            tracing::debug!("Skipping activation of task terminal {}", terminal.name());
            return;
        }

        let id = terminal.id();
        let lock = self.lock_for(id).await;
        let _guard = lock.serial.lock().await;

        let current = self
            .entries
            .read()
            .await
            .get(&id)
            .map(|e| e.record.environment.clone());
        match current {
            Some(active) if active == env.env_id => {
                tracing::debug!("Terminal {} already activated with {}", id, active);
                return;
            }
            Some(active) => {
                tracing::debug!("Terminal {} switching from {} to {}", id, active, env.env_id);
                self.deactivate_locked(terminal).await;
            }
            None => {}
        }

        let dialect = terminal.shell_dialect();
        let Some(command) = activation_command(env, dialect) else {
            tracing::debug!("No {} activation for {}, leaving terminal {} alone", dialect, env.env_id, id);
            return;
        };

        self.run_in_terminal(terminal, &command).await;

        let mut entries = self.entries.write().await;
        if lock.closed.load(Ordering::SeqCst) {
            tracing::debug!("Terminal {} closed while activating, not recording", id);
            return;
        }
        entries.insert(
            id,
            Entry {
                record: ActivationRecord {
                    environment: env.env_id.clone(),
                    activated: true,
                    activated_at: Utc::now(),
                },
                environment: env.clone(),
            },
        );
        drop(entries);
        tracing::info!("Activated {} in terminal {}", env.label(), id);
        self.notify(id, env.env_id.clone(), true);
    }

    /// Deactivate whatever environment is active in `terminal`
    pub async fn deactivate(&self, terminal: &Arc<dyn Terminal>) {
        if is_task_terminal(terminal.as_ref()) {
            tracing::debug!("Skipping deactivation of task terminal {}", terminal.name());
            return;
        }

        let lock = self.lock_for(terminal.id()).await;
        let _guard = lock.serial.lock().await;
        self.deactivate_locked(terminal).await;
    }

    async fn deactivate_locked(&self, terminal: &Arc<dyn Terminal>) {
        let id = terminal.id();
        let Some(environment) = self
            .entries
            .read()
            .await
            .get(&id)
            .map(|e| e.environment.clone())
        else {
            tracing::debug!("Terminal {} is not activated", id);
            return;
        };

        match deactivation_command(&environment, terminal.shell_dialect()) {
            Some(command) => self.run_in_terminal(terminal, &command).await,
            None => tracing::debug!("{} has no deactivation command", environment.env_id),
        }

        self.entries.write().await.remove(&id);
        tracing::info!("Deactivated {} in terminal {}", environment.label(), id);
        self.notify(id, environment.env_id, false);
    }

    /// Forget a closed terminal without running anything in it. An
    /// activation still running in it finishes without leaving a record.
    pub async fn terminal_closed(&self, id: TerminalId) {
        let mut entries = self.entries.write().await;
        if let Some(lock) = self.locks.lock().await.remove(&id) {
            lock.closed.store(true, Ordering::SeqCst);
        }
        entries.remove(&id);
    }

    fn notify(&self, terminal: TerminalId, environment: EnvironmentId, activated: bool) {
        // No receivers is fine
        let _ = self.events.send(ActivationChangeEvent {
            terminal,
            environment,
            activated,
        });
    }

    /// Wait up to the configured timeout for shell integration to show up
    async fn wait_for_shell_integration(&self, terminal: &dyn Terminal) -> bool {
        let deadline = tokio::time::Instant::now() + self.shell_integration_timeout;
        loop {
            if terminal.has_shell_integration() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(SHELL_INTEGRATION_POLL).await;
        }
    }

    async fn run_in_terminal(&self, terminal: &Arc<dyn Terminal>, command: &str) {
        if self.wait_for_shell_integration(terminal.as_ref()).await {
            match terminal.execute_command(command).await {
                Ok(Some(code)) if code != 0 => {
                    tracing::warn!("`{}` exited with {} in terminal {}", command.trim(), code, terminal.id());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to run `{}` in terminal {}: {}", command.trim(), terminal.id(), e);
                }
            }
        } else {
            tracing::debug!("No shell integration in terminal {}, sending text", terminal.id());
            terminal.send_text(command);
        }
    }
}
