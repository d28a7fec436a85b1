use super::{Module, ModuleContext};
use crate::diff::{EnvDiff, EnvMap};
use modenv_config::unescape_references;
use modenv_core::{Error, Result, MULTI_VALUE_SEPARATOR, SCAFFOLDING_PREFIX};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use which::which;

/// Exit status the runner uses when the plugin does not define its entry point
const MISSING_ENTRY_POINT: i32 = 98;

/// Sources the plugin, calls the entry point with its stdout on stderr, then
/// dumps the resulting environment
const ACTIVATE_SCRIPT: &str = r#"source "$1" || exit $?
declare -F "$2" >/dev/null || exit 98
"$2" >&2 || exit $?
env -0"#;

const DEACTIVATE_SCRIPT: &str = r#"source "$1" || exit $?
"$2" >&2"#;

/// A `<name>.sh` plugin defining a `<name>` function and, optionally,
/// `deactivate_<name>`.
///
/// The module's section reaches the script as `MODENV_CFG_<KEY>` variables
/// (repeated values joined by `$MODENV_SEPARATOR`) together with
/// `MODENV_MODULE`, `MODENV_VARIANT` and `MODENV_PROJECT_DIR`. Whatever the
/// entry point exports, minus those variables, is the module's effect.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    name: String,
    path: PathBuf,
    has_deactivate: bool,
}

impl ScriptModule {
    /// Inspect a plugin file without running it
    pub fn load(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        let source = fs::read_to_string(&path)
            .map_err(|e| Error::file_system(&path, "read module", e))?;

        let pattern = format!(
            r"(?m)^\s*(?:function\s+{name}\b|{name}\s*\(\s*\))",
            name = regex::escape(&format!("deactivate_{name}"))
        );
        let has_deactivate = Regex::new(&pattern)
            .map_err(|e| Error::configuration(format!("invalid module name '{name}': {e}")))?
            .is_match(&source);

        Ok(Self {
            name,
            path,
            has_deactivate,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self, ctx: &ModuleContext<'_>, script: &str, entry: &str) -> Result<Command> {
        let bash = which("bash").map_err(|e| {
            Error::activation(&self.name, format!("bash not found: {e}"), None)
        })?;

        let mut cmd = Command::new(bash);
        cmd.arg("-c")
            .arg(script)
            .arg("modenv-module")
            .arg(&self.path)
            .arg(entry)
            .env_clear()
            .envs(ctx.env)
            .envs(scaffolding(ctx))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());
        if ctx.project_dir.is_dir() {
            cmd.current_dir(ctx.project_dir);
        }
        Ok(cmd)
    }
}

impl Module for ScriptModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn implementation(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff> {
        let output = self
            .command(ctx, ACTIVATE_SCRIPT, &self.name)?
            .stdout(Stdio::piped())
            .output()
            .map_err(|e| Error::activation(&self.name, e.to_string(), None))?;

        match output.status.code() {
            Some(0) => {}
            Some(MISSING_ENTRY_POINT) => {
                return Err(Error::activation(
                    &self.name,
                    format!(
                        "'{}' does not define a '{}' function",
                        self.path.display(),
                        self.name
                    ),
                    Some(MISSING_ENTRY_POINT),
                ))
            }
            code => {
                return Err(Error::activation(
                    &self.name,
                    "activation entry point failed",
                    code,
                ))
            }
        }

        let mut after = parse_env_dump(&String::from_utf8_lossy(&output.stdout));
        for key in scaffolding(ctx).into_iter().map(|(key, _)| key) {
            match ctx.env.get(&key) {
                Some(original) => {
                    after.insert(key, original.clone());
                }
                None => {
                    after.remove(&key);
                }
            }
        }

        let diff = EnvDiff::between(ctx.env, &after);
        tracing::debug!(
            module = %self.name,
            changed = diff.added_or_changed().len(),
            removed = diff.removed().len(),
            "script module activated"
        );
        Ok(diff)
    }

    fn has_deactivate(&self) -> bool {
        self.has_deactivate
    }

    fn deactivate(&self, ctx: &ModuleContext<'_>) -> Result<()> {
        let entry = format!("deactivate_{}", self.name);
        let status = self
            .command(ctx, DEACTIVATE_SCRIPT, &entry)?
            .stdout(Stdio::null())
            .status()
            .map_err(|e| Error::activation(&self.name, e.to_string(), None))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::activation(
                &self.name,
                format!("{entry} failed"),
                status.code(),
            ))
        }
    }
}

/// Transient variables describing the module to its script
fn scaffolding(ctx: &ModuleContext<'_>) -> Vec<(String, String)> {
    let mut vars = vec![
        (format!("{SCAFFOLDING_PREFIX}MODULE"), ctx.module.full_name()),
        (
            format!("{SCAFFOLDING_PREFIX}VARIANT"),
            ctx.module.variant.clone().unwrap_or_default(),
        ),
        (
            format!("{SCAFFOLDING_PREFIX}SEPARATOR"),
            MULTI_VALUE_SEPARATOR.to_string(),
        ),
        (
            format!("{SCAFFOLDING_PREFIX}PROJECT_DIR"),
            ctx.project_dir.display().to_string(),
        ),
    ];
    if let Some(section) = ctx.section {
        for (key, value) in section.iter() {
            vars.push((config_var_name(key), unescape_references(value)));
        }
    }
    vars
}

/// `MODENV_CFG_<KEY>` with the key upper-cased and anything outside
/// `[A-Z0-9_]` replaced by `_` (so `prod,region` becomes `PROD_REGION`)
fn config_var_name(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{SCAFFOLDING_PREFIX}CFG_{key}")
}

/// Parse the NUL separated output of `env -0`
fn parse_env_dump(dump: &str) -> EnvMap {
    dump.split('\0')
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
