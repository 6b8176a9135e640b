//! Shell activation core for envact
//!
//! This crate provides:
//! - Command synthesis for every supported shell dialect
//! - Startup script providers that install/remove activation hooks in
//!   shell profiles (and the cmd.exe AutoRun chain on Windows)
//! - Environment variable providers used by shell-startup activation
//! - The per-terminal activation state machine
//! - The terminal manager that decides how each terminal gets activated

mod activation;
mod command;
mod envvars;
mod error;
mod manager;
pub mod startup;

pub use activation::*;
pub use command::*;
pub use envvars::*;
pub use error::*;
pub use manager::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
