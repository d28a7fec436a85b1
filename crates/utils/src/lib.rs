//! Shared utilities and pure functions for modenv
//!
//! This crate provides common utility functions that are used throughout
//! the modenv workspace: atomic file writes, XDG and session path layout,
//! and the diagnostic logging setup.

pub mod atomic_file;
pub mod paths;
pub mod logging;
pub mod xdg;

pub use atomic_file::*;
pub use paths::*;
pub use xdg::*;
