//! Configuration for envact
//!
//! This crate handles the persisted settings file
//! (`~/.config/envact/config.toml`), most importantly the
//! `terminal.autoActivationType` preference.

mod error;
mod global;

pub use error::*;
pub use global::*;
