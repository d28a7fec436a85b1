use crate::context::{absolute, process_env, resolve_shell, App};
use modenv_config::{current_directory, ConfigLocator};
use modenv_core::{Error, Result, MODENV_DIR_VAR};
use modenv_env::ActivationOutcome;
use std::env;
use std::path::{Path, PathBuf};

pub fn activate(app: &App, directory: Option<PathBuf>, shell: Option<&str>) -> Result<i32> {
    let shell = resolve_shell(shell)?;
    let controller = app.controller()?;
    let start = match directory {
        Some(dir) => absolute(&dir)?,
        None => current_directory()?,
    };
    let project_dir = nearest_project(controller.locator(), &start).ok_or_else(|| {
        Error::configuration(format!(
            "no {} in '{}' or any parent directory",
            controller.locator().file_name(),
            start.display()
        ))
    })?;

    let outcome = controller.activate(&project_dir, process_env());
    summarize(&outcome);
    print!("{}", shell.render(&outcome.diff));
    Ok(outcome.exit_code())
}

pub fn deactivate(app: &App, directory: Option<PathBuf>, shell: Option<&str>) -> Result<i32> {
    let shell = resolve_shell(shell)?;
    let controller = app.controller()?;
    let project_dir = match directory {
        Some(dir) => absolute(&dir)?,
        None => match active_project() {
            Some(dir) => dir,
            None => {
                tracing::info!("no active environment");
                return Ok(0);
            }
        },
    };

    let outcome = controller.deactivate(&project_dir, process_env());
    summarize(&outcome);
    print!("{}", shell.render(&outcome.diff));
    Ok(outcome.exit_code())
}

/// Directory holding the nearest configuration file at or above `start`
pub(super) fn nearest_project(locator: &ConfigLocator, start: &Path) -> Option<PathBuf> {
    locator
        .find_config(start)
        .and_then(|file| file.parent().map(Path::to_path_buf))
}

/// Project directory the invoking shell currently has active
pub(super) fn active_project() -> Option<PathBuf> {
    env::var(MODENV_DIR_VAR)
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

pub(super) fn summarize(outcome: &ActivationOutcome) {
    tracing::debug!(
        dir = %outcome.project_dir.display(),
        loaded = %outcome.loaded.join(","),
        unwound = %outcome.unwound.join(","),
        "lifecycle finished"
    );
    if !outcome.succeeded {
        tracing::warn!(
            dir = %outcome.project_dir.display(),
            errors = outcome.errors.len(),
            "environment not activated"
        );
    }
}
