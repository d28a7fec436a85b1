use miette::Diagnostic;
use modenv_config::{current_directory, FailurePolicy, Settings, SettingsLoader};
use modenv_core::{Error, Result};
use modenv_env::{EnvMap, LifecycleController, ModuleRegistry};
use modenv_shell::{Shell, ShellType};
use modenv_utils::current_session_id;
use std::env;
use std::path::{Path, PathBuf};

/// Global command-line overrides shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct App {
    pub allow_commands: bool,
    pub failure_policy: Option<FailurePolicy>,
}

impl App {
    pub fn settings(&self) -> Result<Settings> {
        let mut loader = SettingsLoader::new();
        if self.allow_commands {
            loader = loader.allow_commands(true);
        }
        if let Some(policy) = self.failure_policy {
            loader = loader.failure_policy(policy);
        }
        loader.load()
    }

    /// Controller for the invoking shell session, with every configured
    /// module directory discovered
    pub fn controller(&self) -> Result<LifecycleController> {
        let settings = self.settings()?;
        let registry = ModuleRegistry::discover(&settings.module_path)?;
        let mut controller = LifecycleController::new(settings, registry, current_session_id());
        if let Ok(exe) = env::current_exe() {
            controller = controller.with_trusted_files(vec![exe]);
        }
        Ok(controller)
    }
}

/// Shell named on the command line, `$SHELL` otherwise
pub fn resolve_shell(name: Option<&str>) -> Result<Box<dyn Shell>> {
    let shell_type = match name {
        Some(name) => ShellType::detect_from_arg(name),
        None => ShellType::detect_from_env(),
    };
    if !shell_type.is_supported() {
        return Err(Error::configuration(format!(
            "unsupported shell '{shell_type}' (expected bash, zsh or fish)"
        )));
    }
    Ok(shell_type.as_shell())
}

/// The environment of this process, as inherited from the shell
pub fn process_env() -> EnvMap {
    env::vars().collect()
}

/// Absolute form of `path`, relative paths taken from the working directory
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(current_directory()?.join(path))
    }
}

/// Write an error and its corrective action to the diagnostic stream
pub fn report(error: &Error) {
    match error.help() {
        Some(help) => tracing::error!(help = %help, "{error}"),
        None => tracing::error!("{error}"),
    }
}
