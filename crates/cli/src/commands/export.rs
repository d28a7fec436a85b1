use super::lifecycle::{active_project, nearest_project, summarize};
use crate::context::{process_env, resolve_shell, App};
use modenv_config::current_directory;
use modenv_core::Result;
use modenv_env::EnvDiff;

/// Bring the shell in line with the working directory: deactivate the
/// project that is no longer current, activate the one that now is, and
/// print the combined change as shell code.
pub fn execute(app: &App, shell: &str) -> Result<i32> {
    let shell = resolve_shell(Some(shell))?;
    let controller = app.controller()?;
    let cwd = current_directory()?;

    let target = nearest_project(controller.locator(), &cwd);
    let active = active_project();
    if target == active {
        tracing::trace!("environment unchanged");
        return Ok(0);
    }

    let mut env = process_env();
    let mut diff = EnvDiff::default();
    let mut code = 0;

    if let Some(previous) = active {
        tracing::debug!(dir = %previous.display(), "leaving project");
        let outcome = controller.deactivate(&previous, env.clone());
        summarize(&outcome);
        outcome.diff.apply(&mut env);
        diff = diff.merge(&outcome.diff);
        code = code.max(outcome.exit_code());
    }

    if let Some(next) = target {
        tracing::debug!(dir = %next.display(), "entering project");
        let outcome = controller.activate(&next, env);
        summarize(&outcome);
        diff = diff.merge(&outcome.diff);
        code = code.max(outcome.exit_code());
    }

    print!("{}", shell.render(&diff));
    Ok(code)
}
