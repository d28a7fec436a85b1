use super::{ActivationOutcome, LifecycleState};
use crate::diff::{EnvDiff, EnvMap};
use miette::Diagnostic;
use modenv_core::Error;
use std::path::PathBuf;

/// Short-lived state of one activation or deactivation.
///
/// Created when the request arrives and consumed by [`ActivationContext::reset`],
/// which leaves nothing behind but the net environment change.
#[derive(Debug)]
pub struct ActivationContext {
    project_dir: PathBuf,
    base_env: EnvMap,
    working: EnvMap,
    depth: usize,
    transitions: Vec<LifecycleState>,
    errors: Vec<Error>,
    loaded: Vec<String>,
    unwound: Vec<String>,
}

impl ActivationContext {
    pub fn new(project_dir: impl Into<PathBuf>, env: EnvMap) -> Self {
        Self {
            project_dir: project_dir.into(),
            working: env.clone(),
            base_env: env,
            depth: 0,
            transitions: vec![LifecycleState::Idle],
            errors: Vec::new(),
            loaded: Vec::new(),
            unwound: Vec::new(),
        }
    }

    /// Environment as seen by the next module
    pub fn env(&self) -> &EnvMap {
        &self.working
    }

    /// Most recent state of the outermost activation
    pub fn state(&self) -> LifecycleState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(LifecycleState::Idle)
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Whether this context is running an activation on behalf of a child
    /// directory
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    pub(crate) fn enter_nested(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn transition(&mut self, state: LifecycleState) {
        tracing::debug!(state = ?state, depth = self.depth, "lifecycle transition");
        if self.depth == 0 {
            self.transitions.push(state);
        }
    }

    pub(crate) fn apply(&mut self, diff: &EnvDiff) {
        diff.apply(&mut self.working);
    }

    pub(crate) fn set_var(&mut self, key: &str, value: String) {
        self.working.insert(key.to_string(), value);
    }

    pub(crate) fn unset_var(&mut self, key: &str) {
        self.working.remove(key);
    }

    pub(crate) fn fail(&mut self, error: Error) {
        match error.help() {
            Some(help) => tracing::error!(help = %help, "{error}"),
            None => tracing::error!("{error}"),
        }
        self.errors.push(error);
    }

    pub(crate) fn loaded(&mut self, name: &str) {
        self.loaded.push(name.to_string());
    }

    pub(crate) fn unwound(&mut self, name: &str) {
        self.unwound.push(name.to_string());
    }

    /// Discard all transient state, keeping only the net environment change
    pub fn reset(mut self) -> ActivationOutcome {
        self.depth = 0;
        self.transition(LifecycleState::Reset);
        self.transition(LifecycleState::Idle);

        let diff = EnvDiff::between(&self.base_env, &self.working);
        ActivationOutcome {
            project_dir: self.project_dir,
            succeeded: self.errors.is_empty(),
            diff,
            errors: self.errors,
            transitions: self.transitions,
            loaded: self.loaded,
            unwound: self.unwound,
        }
    }
}
