//! Activation state machine
//!
//! ```text
//! Idle -> Verifying -> Parsing -> LoadingModules -> Succeeded -> Reset -> Idle
//!                                               \-> Unwinding -> Reset -> Idle
//! Verifying / Parsing -> Aborted -> Reset -> Idle
//! ```
//!
//! Integrity and parse errors abort before any module is touched. Module
//! errors are collected (or stop the run under [`FailurePolicy::FailFast`])
//! and any of them unwinds everything that was loaded.

mod context;

pub use context::ActivationContext;

use crate::diff::{EnvDiff, EnvMap};
use crate::loader::ModuleLoader;
use crate::module::{ModuleContext, ModuleRegistry};
use crate::state::{ModuleRecord, Session, SessionState};
use modenv_config::{ConfigDocument, ConfigLocator, FailurePolicy, ParseOptions, Parser, Settings};
use modenv_core::{Error, ModuleRef, Result, MODENV_DIR_VAR};
use modenv_security::{IntegrityStore, Verification};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Idle,
    Verifying,
    Parsing,
    LoadingModules,
    Succeeded,
    Unwinding,
    /// Terminal failure before any module was loaded
    Aborted,
    Reset,
}

/// Result of an activation or deactivation, handed back to the caller once
/// the context has been reset
#[derive(Debug)]
pub struct ActivationOutcome {
    pub project_dir: PathBuf,
    pub succeeded: bool,
    /// Net change to apply to the invoking shell
    pub diff: EnvDiff,
    pub errors: Vec<Error>,
    /// States visited by the outermost activation
    pub transitions: Vec<LifecycleState>,
    /// Modules loaded, in order, nested activations included
    pub loaded: Vec<String>,
    /// Ledger entries unwound, in deactivation order
    pub unwound: Vec<String>,
}

impl ActivationOutcome {
    /// Process exit status for the outcome
    pub fn exit_code(&self) -> i32 {
        if self.succeeded {
            0
        } else {
            1
        }
    }
}

/// Orchestrates verification, parsing, module loading and unwinding for
/// project directories of one shell session
#[derive(Debug)]
pub struct LifecycleController {
    settings: Settings,
    registry: ModuleRegistry,
    integrity: IntegrityStore,
    locator: ConfigLocator,
    session_id: String,
    trusted_files: Vec<PathBuf>,
}

impl LifecycleController {
    pub fn new(settings: Settings, registry: ModuleRegistry, session_id: impl Into<String>) -> Self {
        let integrity = integrity_store(&settings);
        let locator = ConfigLocator::new(settings.config_file_name.clone());
        Self {
            settings,
            registry,
            integrity,
            locator,
            session_id: session_id.into(),
            trusted_files: Vec::new(),
        }
    }

    /// Files verified before every activation when `verify_self` is set
    pub fn with_trusted_files(mut self, files: Vec<PathBuf>) -> Self {
        self.trusted_files = files;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn integrity(&self) -> &IntegrityStore {
        &self.integrity
    }

    pub fn locator(&self) -> &ConfigLocator {
        &self.locator
    }

    /// Session files for `project_dir`
    pub fn session(&self, project_dir: &Path) -> Session {
        Session::open(&self.settings.runtime_dir, &self.session_id, project_dir)
    }

    /// Activate the configuration in `project_dir` on top of `env`
    pub fn activate(&self, project_dir: &Path, env: EnvMap) -> ActivationOutcome {
        let mut ctx = ActivationContext::new(project_dir, env);
        if !self.run(project_dir, &mut ctx) {
            let active = ctx.env().get(MODENV_DIR_VAR).map(PathBuf::from);
            if active.as_deref() == Some(project_dir) {
                ctx.unset_var(MODENV_DIR_VAR);
            }
        }
        ctx.reset()
    }

    /// Undo whatever is recorded for `project_dir` in this session
    pub fn deactivate(&self, project_dir: &Path, env: EnvMap) -> ActivationOutcome {
        let mut ctx = ActivationContext::new(project_dir, env);
        ctx.transition(LifecycleState::Unwinding);
        self.unwind(project_dir, &mut ctx);
        ctx.unset_var(MODENV_DIR_VAR);
        ctx.reset()
    }

    /// Deactivate every ledgered module of `project_dir` in reverse load
    /// order and revert their recorded effects, then clear the session.
    ///
    /// Best effort: failures are logged and the next module is tried. A
    /// deactivation script that fails its integrity check is skipped and
    /// recorded as an error.
    pub fn unwind(&self, project_dir: &Path, ctx: &mut ActivationContext) {
        let session = self.session(project_dir);
        let state = session.load_state().unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable session state: {e}");
            None
        });
        let names = session.ledger().reversed().unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable ledger: {e}");
            Vec::new()
        });

        for name in names {
            let record = state.as_ref().and_then(|s| s.module(&name));
            if let Err(e) = self.deactivate_module(&name, record, project_dir, ctx.env()) {
                ctx.fail(e);
            }
            if let Some(record) = record {
                ctx.apply(&record.diff.reverse());
            }
            ctx.unwound(&name);
        }

        if let Err(e) = session.clear() {
            tracing::warn!("could not clear session state: {e}");
        }

        if let Some(parent) = state.and_then(|s| s.chained_parent) {
            tracing::debug!(parent = %parent.display(), "unwinding chained parent");
            self.unwind(&parent, ctx);
        }
    }

    /// Run the deactivation entry point of `name`, if it has one.
    ///
    /// A script whose content no longer matches its trust record is not
    /// sourced; the error is returned so the caller can report it while the
    /// recorded effect is still reverted. Failures of the entry point itself
    /// are only logged.
    fn deactivate_module(
        &self,
        name: &str,
        record: Option<&ModuleRecord>,
        project_dir: &Path,
        env: &EnvMap,
    ) -> Result<()> {
        let module_ref = ModuleRef::parse(name);
        let Some(module) = self.registry.get(module_ref.base()) else {
            tracing::warn!(module = %name, "module is no longer available, reverting its recorded effect only");
            return Ok(());
        };
        if !module.has_deactivate() {
            tracing::trace!(module = %name, "no deactivation entry point");
            return Ok(());
        }
        if let Some(file) = module.implementation() {
            self.integrity.verify(file)?;
        }

        let module_ctx = ModuleContext {
            module: &module_ref,
            section: record.and_then(|r| r.section.as_ref()),
            project_dir,
            env,
        };
        match module.deactivate(&module_ctx) {
            Ok(()) => tracing::debug!(module = %name, "module deactivated"),
            Err(e) => tracing::warn!(module = %name, "deactivation failed: {e}"),
        }
        Ok(())
    }

    /// One activation of `project_dir` inside `ctx`; returns whether it succeeded
    fn run(&self, project_dir: &Path, ctx: &mut ActivationContext) -> bool {
        ctx.transition(LifecycleState::Verifying);
        if !ctx.is_nested() {
            if let Err(e) = self.verify_self() {
                ctx.fail(e);
                ctx.transition(LifecycleState::Aborted);
                return false;
            }
        }

        let session = self.session(project_dir);
        if session.is_stale() {
            tracing::info!(dir = %project_dir.display(), "unwinding modules left by an earlier activation");
            let before = ctx.errors().len();
            self.unwind(project_dir, ctx);
            if ctx.errors().len() > before {
                ctx.transition(LifecycleState::Aborted);
                return false;
            }
        }

        ctx.transition(LifecycleState::Parsing);
        let config_file = project_dir.join(self.locator.file_name());
        let document = match self.read_config(&config_file, project_dir) {
            Ok(document) => document,
            Err(e) => {
                ctx.fail(e);
                ctx.transition(LifecycleState::Aborted);
                return false;
            }
        };

        let mut state = SessionState::new(project_dir, &config_file);
        state.config_digest = self.integrity.stored_digest(&config_file).ok().flatten();

        if document.chain_upward() {
            if let Some(parent_config) = self.locator.parent_config(project_dir) {
                let parent_dir = parent_config
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                tracing::debug!(parent = %parent_dir.display(), "chaining onto parent configuration");

                ctx.enter_nested();
                let parent_ok = self.run(&parent_dir, ctx);
                ctx.leave_nested();

                if !parent_ok {
                    ctx.transition(LifecycleState::Unwinding);
                    self.unwind(project_dir, ctx);
                    return false;
                }
                state.chained_parent = Some(parent_dir);
                if let Err(e) = session.save_state(&state) {
                    ctx.fail(e);
                    ctx.transition(LifecycleState::Unwinding);
                    self.unwind(project_dir, ctx);
                    return false;
                }
            } else {
                tracing::debug!("chain requested but no parent configuration found");
            }
        }

        ctx.transition(LifecycleState::LoadingModules);
        let failed = self.load_modules(&document, &config_file, project_dir, &session, &mut state, ctx);

        if failed {
            ctx.transition(LifecycleState::Unwinding);
            self.unwind(project_dir, ctx);
            return false;
        }

        if let Err(e) = session.save_state(&state) {
            ctx.fail(e);
            ctx.transition(LifecycleState::Unwinding);
            self.unwind(project_dir, ctx);
            return false;
        }

        ctx.transition(LifecycleState::Succeeded);
        if !ctx.is_nested() {
            ctx.set_var(MODENV_DIR_VAR, project_dir.display().to_string());
        }
        tracing::info!(dir = %project_dir.display(), "environment active");
        true
    }

    /// Attempt every module of `document`; returns whether any failed
    fn load_modules(
        &self,
        document: &ConfigDocument,
        config_file: &Path,
        project_dir: &Path,
        session: &Session,
        state: &mut SessionState,
        ctx: &mut ActivationContext,
    ) -> bool {
        let loader = ModuleLoader::new(&self.registry, &self.integrity, session.ledger(), config_file);
        let mut failed = false;

        for module in document.module_refs() {
            match loader.load(&module, document, project_dir, ctx.env()) {
                Ok(loaded) => {
                    ctx.apply(&loaded.diff);
                    ctx.loaded(&loaded.name);
                    let revert = loaded.diff.reverse();
                    state.record(ModuleRecord {
                        name: loaded.name,
                        diff: loaded.diff,
                        section: loaded.section,
                    });
                    if let Err(e) = session.save_state(state) {
                        // Unwinding only sees persisted records
                        ctx.apply(&revert);
                        ctx.fail(e);
                        failed = true;
                        break;
                    }
                }
                Err(e) => {
                    let fatal = e.is_fatal();
                    ctx.fail(e);
                    failed = true;
                    if fatal || self.settings.failure_policy == FailurePolicy::FailFast {
                        break;
                    }
                }
            }
        }
        failed
    }

    fn verify_self(&self) -> Result<()> {
        if !self.settings.verify_self {
            return Ok(());
        }
        for file in &self.trusted_files {
            if self.integrity.verify(file)? == Verification::Bootstrapped {
                tracing::info!(path = %file.display(), "trusting on first use");
            }
        }
        Ok(())
    }

    fn read_config(&self, config_file: &Path, project_dir: &Path) -> Result<ConfigDocument> {
        if !config_file.is_file() {
            return Err(Error::configuration(format!(
                "no {} in '{}'",
                self.locator.file_name(),
                project_dir.display()
            )));
        }
        if self.integrity.verify(config_file)? == Verification::Bootstrapped {
            tracing::info!(path = %config_file.display(), "trusting configuration on first use");
        }

        Parser::new(ParseOptions {
            allow_commands: self.settings.allow_commands,
            working_dir: Some(project_dir.to_path_buf()),
        })
        .parse_file(config_file)
    }
}

/// Digest store with every module directory registered as a content root
fn integrity_store(settings: &Settings) -> IntegrityStore {
    settings
        .module_path
        .iter()
        .enumerate()
        .fold(IntegrityStore::new(settings.digest_dir()), |store, (index, dir)| {
            let name = if index == 0 {
                "modules".to_string()
            } else {
                format!("modules-{index}")
            };
            store.with_root(name, dir)
        })
}

#[cfg(test)]
mod tests;
