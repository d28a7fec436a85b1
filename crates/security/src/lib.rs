//! Security features for modenv
//!
//! This crate provides the integrity verifier that gates every load: trusted
//! scripts, module implementations and configuration files are only used
//! while their content digest matches the recorded one.

pub mod integrity;

pub use integrity::*;
