//! Core domain types, errors, and constants for the `modenv` application.
//!
//! This crate establishes the foundational data structures and error handling
//! used throughout the workspace.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing all failure modes of an activation.
//! - **`types`**: Small shared domain types such as `ModuleRef` and `Severity`.
//! - **`constants`**: Reserved tokens of the configuration format, file names
//!   and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
