//! Runtime settings of the activator itself
//!
//! Distinct from the per-project configuration file: these settings decide
//! where trust records and session state live, where script modules are
//! discovered, and how activation failures are handled.
//!
//! Layering, lowest to highest precedence: built-in defaults, the optional
//! `settings.json` in the XDG config dir, `MODENV_*` environment variables,
//! explicit overrides on the [`SettingsLoader`].

use modenv_core::{
    Error, Result, CONFIG_FILENAME, MODENV_ALLOW_COMMANDS_VAR, MODENV_DATA_DIR_VAR,
    MODENV_FAILURE_POLICY_VAR, MODENV_FILE_VAR, MODENV_MODULE_PATH_VAR, MODENV_RUNTIME_DIR_VAR,
    MODENV_VERIFY_SELF_VAR,
};
use modenv_utils::{read_optional, XdgPaths};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when a module fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Attempt every module, then unwind if any failed
    #[default]
    BestEffort,
    /// Stop at the first failing module, then unwind
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "continue" => Ok(FailurePolicy::BestEffort),
            "fail-fast" | "fail_fast" | "abort" => Ok(FailurePolicy::FailFast),
            other => Err(Error::configuration(format!(
                "unknown failure policy '{other}' (expected 'best-effort' or 'fail-fast')"
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::BestEffort => f.write_str("best-effort"),
            FailurePolicy::FailFast => f.write_str("fail-fast"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// File name looked up in project directories
    pub config_file_name: String,
    /// Root of the trust-record store
    pub data_dir: PathBuf,
    /// Root of session-temporary state (ledgers)
    pub runtime_dir: PathBuf,
    /// Directories scanned for `<module>.sh` plugins, in priority order
    pub module_path: Vec<PathBuf>,
    /// Evaluate `cmd:` values in configuration files
    pub allow_commands: bool,
    pub failure_policy: FailurePolicy,
    /// Verify the activator's own executable before every activation
    pub verify_self: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_file_name: CONFIG_FILENAME.to_string(),
            data_dir: XdgPaths::data_dir(),
            runtime_dir: XdgPaths::runtime_dir(),
            module_path: vec![XdgPaths::module_dir()],
            allow_commands: false,
            failure_policy: FailurePolicy::default(),
            verify_self: true,
        }
    }
}

impl Settings {
    /// Directory holding trust records
    pub fn digest_dir(&self) -> PathBuf {
        self.data_dir.join("digests")
    }
}

/// Builds [`Settings`] from defaults, file, environment and overrides
#[derive(Debug, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    skip_file: bool,
    skip_env: bool,
    allow_commands: Option<bool>,
    failure_policy: Option<FailurePolicy>,
    verify_self: Option<bool>,
    data_dir: Option<PathBuf>,
    runtime_dir: Option<PathBuf>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from `path` instead of the XDG location
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Ignore any settings file
    pub fn without_file(mut self) -> Self {
        self.skip_file = true;
        self
    }

    /// Ignore `MODENV_*` environment variables
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn allow_commands(mut self, allow: bool) -> Self {
        self.allow_commands = Some(allow);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn verify_self(mut self, verify: bool) -> Self {
        self.verify_self = Some(verify);
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    pub fn load(self) -> Result<Settings> {
        let mut settings = if self.skip_file {
            Settings::default()
        } else {
            let path = self.file.clone().unwrap_or_else(XdgPaths::settings_file);
            load_file(&path)?.unwrap_or_default()
        };

        if !self.skip_env {
            apply_env(&mut settings)?;
        }

        if let Some(allow) = self.allow_commands {
            settings.allow_commands = allow;
        }
        if let Some(policy) = self.failure_policy {
            settings.failure_policy = policy;
        }
        if let Some(verify) = self.verify_self {
            settings.verify_self = verify;
        }
        if let Some(dir) = self.data_dir {
            settings.data_dir = dir;
        }
        if let Some(dir) = self.runtime_dir {
            settings.runtime_dir = dir;
        }

        tracing::debug!(
            data_dir = %settings.data_dir.display(),
            runtime_dir = %settings.runtime_dir.display(),
            failure_policy = %settings.failure_policy,
            allow_commands = settings.allow_commands,
            "settings loaded"
        );

        Ok(settings)
    }
}

fn load_file(path: &Path) -> Result<Option<Settings>> {
    match read_optional(path)? {
        Some(content) => {
            let settings = serde_json::from_str(&content).map_err(|e| {
                Error::configuration(format!("invalid settings file '{}': {e}", path.display()))
            })?;
            Ok(Some(settings))
        }
        None => Ok(None),
    }
}

fn apply_env(settings: &mut Settings) -> Result<()> {
    if let Some(name) = env_value(MODENV_FILE_VAR) {
        settings.config_file_name = name;
    }
    if let Some(dir) = env_value(MODENV_DATA_DIR_VAR) {
        settings.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env_value(MODENV_RUNTIME_DIR_VAR) {
        settings.runtime_dir = PathBuf::from(dir);
    }
    if let Some(path) = env_value(MODENV_MODULE_PATH_VAR) {
        settings.module_path = env::split_paths(&path).collect();
    }
    if let Some(value) = env_value(MODENV_ALLOW_COMMANDS_VAR) {
        settings.allow_commands = parse_bool(MODENV_ALLOW_COMMANDS_VAR, &value)?;
    }
    if let Some(value) = env_value(MODENV_FAILURE_POLICY_VAR) {
        settings.failure_policy = value.parse()?;
    }
    if let Some(value) = env_value(MODENV_VERIFY_SELF_VAR) {
        settings.verify_self = parse_bool(MODENV_VERIFY_SELF_VAR, &value)?;
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::configuration(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
