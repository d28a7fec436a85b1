use crate::diff::{EnvDiff, EnvMap};
use crate::ledger::LoadedModulesLedger;
use crate::module::{ModuleContext, ModuleRegistry};
use modenv_config::{ConfigDocument, Section};
use modenv_core::{Error, ModuleRef, Result};
use modenv_security::{IntegrityStore, Verification};
use std::path::Path;

/// A module that activated successfully
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Full name, variant included, as written to the ledger
    pub name: String,
    pub diff: EnvDiff,
    pub section: Option<Section>,
    /// `false` when the ledger already listed the module
    pub recorded: bool,
}

/// Resolves, verifies and activates one module at a time, recording each
/// success in the ledger
pub struct ModuleLoader<'a> {
    registry: &'a ModuleRegistry,
    integrity: &'a IntegrityStore,
    ledger: &'a LoadedModulesLedger,
    config_file: &'a Path,
}

impl<'a> ModuleLoader<'a> {
    pub fn new(
        registry: &'a ModuleRegistry,
        integrity: &'a IntegrityStore,
        ledger: &'a LoadedModulesLedger,
        config_file: &'a Path,
    ) -> Self {
        Self {
            registry,
            integrity,
            ledger,
            config_file,
        }
    }

    /// Load `module` with its section from `document`.
    ///
    /// Fails with `ModuleNotFound` when nothing is registered under the base
    /// name, `Tampered` when the implementation changed since it was trusted
    /// and `Activation` when the module itself fails. The ledger is only
    /// written on success.
    pub fn load(
        &self,
        module: &ModuleRef,
        document: &ConfigDocument,
        project_dir: &Path,
        env: &EnvMap,
    ) -> Result<LoadedModule> {
        let name = module.full_name();
        let implementation = self
            .registry
            .get(module.base())
            .ok_or_else(|| Error::module_not_found(&name, self.config_file))?;

        if let Some(file) = implementation.implementation() {
            if self.integrity.verify(file)? == Verification::Bootstrapped {
                tracing::info!(module = %name, path = %file.display(), "trusting module on first use");
            }
        }

        let section = document.section(module.base());
        let ctx = ModuleContext {
            module,
            section,
            project_dir,
            env,
        };

        let diff = implementation.activate(&ctx).map_err(|e| match e {
            Error::Activation { .. } | Error::Tampered { .. } => e,
            other => Error::activation(&name, other.to_string(), None),
        })?;

        let recorded = self.ledger.record(&name)?;
        tracing::debug!(module = %name, "module loaded");

        Ok(LoadedModule {
            name,
            diff,
            section: section.cloned(),
            recorded,
        })
    }
}
