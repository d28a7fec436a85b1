//! Pluggable units of environment setup
//!
//! A module turns its configuration section into an [`EnvDiff`] against the
//! working environment. Modules come from two places: built-ins compiled into
//! the binary and `<name>.sh` script plugins found on the module path.

pub mod builtin;
mod registry;
mod script;

pub use registry::ModuleRegistry;
pub use script::ScriptModule;

use crate::diff::{EnvDiff, EnvMap};
use modenv_config::Section;
use modenv_core::{ModuleRef, Result};
use std::path::Path;

/// Everything a module sees while it runs
#[derive(Debug, Clone, Copy)]
pub struct ModuleContext<'a> {
    /// The module as named by the configuration, variant included
    pub module: &'a ModuleRef,
    /// The module's section; `None` when it only appears in `[default] modules`
    pub section: Option<&'a Section>,
    /// Directory holding the configuration file
    pub project_dir: &'a Path,
    /// Environment as left by the modules loaded before this one
    pub env: &'a EnvMap,
}

impl<'a> ModuleContext<'a> {
    /// Values of `key`, empty when the key or the section is missing
    pub fn values(&self, key: &str) -> Vec<&'a str> {
        self.section
            .map(|section| section.values(key))
            .unwrap_or_default()
    }

    /// Resolve a deferred `$VAR` reference against the working environment
    pub fn interpolate(&self, value: &str) -> String {
        Section::interpolate(value, |var| self.env.get(var).cloned())
    }
}

/// Activation contract of a module
pub trait Module: Send + Sync {
    /// Base name the module is registered under
    fn name(&self) -> &str;

    /// File whose integrity gates loading; built-ins have none
    fn implementation(&self) -> Option<&Path> {
        None
    }

    /// Apply the module and report its effect on the environment
    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff>;

    /// Whether [`Module::deactivate`] does anything beyond reverting the
    /// recorded environment effect
    fn has_deactivate(&self) -> bool {
        false
    }

    fn deactivate(&self, _ctx: &ModuleContext<'_>) -> Result<()> {
        Ok(())
    }
}
