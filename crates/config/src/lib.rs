//! Configuration parsing and management for modenv
//!
//! This crate handles the per-project configuration file (sections of
//! `key=value` lines) and the runtime settings of the activator itself.

pub mod discovery;
pub mod parser;
pub mod settings;

pub use discovery::*;
pub use parser::*;
pub use settings::*;
