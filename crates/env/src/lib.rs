//! Module loading and the activation lifecycle
//!
//! [`LifecycleController`] drives one activation: verify, parse, load every
//! module through the [`ModuleLoader`], and unwind through the
//! [`LoadedModulesLedger`] when anything fails.

pub mod diff;
pub mod ledger;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod state;

pub use diff::{EnvDiff, EnvMap};
pub use ledger::LoadedModulesLedger;
pub use lifecycle::{ActivationContext, ActivationOutcome, LifecycleController, LifecycleState};
pub use loader::{LoadedModule, ModuleLoader};
pub use module::{Module, ModuleContext, ModuleRegistry, ScriptModule};
pub use state::{ModuleRecord, Session, SessionState};
