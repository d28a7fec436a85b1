use crate::diff::EnvDiff;
use crate::module::{Module, ModuleContext};
use modenv_core::{Error, Result};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Adds directories to `PATH`: `prepend` entries in front (first listed ends
/// up first), `append` entries at the end. Relative entries are resolved
/// against the project directory and entries already present are skipped.
#[derive(Debug, Default)]
pub struct PathModule;

impl PathModule {
    fn resolve(ctx: &ModuleContext<'_>, entry: &str) -> Option<PathBuf> {
        let entry = ctx.interpolate(entry.trim());
        if entry.is_empty() {
            return None;
        }
        let path = PathBuf::from(entry);
        Some(if path.is_absolute() {
            path
        } else {
            ctx.project_dir.join(path)
        })
    }
}

impl Module for PathModule {
    fn name(&self) -> &str {
        "path"
    }

    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff> {
        let current = ctx.env.get("PATH").cloned().unwrap_or_default();
        let existing: Vec<PathBuf> = env::split_paths(&current).collect();

        let mut front: Vec<PathBuf> = Vec::new();
        for entry in ctx.values("prepend") {
            if let Some(path) = Self::resolve(ctx, entry) {
                if !existing.contains(&path) && !front.contains(&path) {
                    front.push(path);
                }
            }
        }

        let mut back: Vec<PathBuf> = Vec::new();
        for entry in ctx.values("append") {
            if let Some(path) = Self::resolve(ctx, entry) {
                if !existing.contains(&path) && !front.contains(&path) && !back.contains(&path) {
                    back.push(path);
                }
            }
        }

        if front.is_empty() && back.is_empty() {
            return Ok(EnvDiff::default());
        }

        let combined: Vec<PathBuf> = front
            .into_iter()
            .chain(existing.into_iter().filter(|p| !p.as_os_str().is_empty()))
            .chain(back)
            .collect();
        let joined: OsString = env::join_paths(combined).map_err(|e| {
            Error::activation(self.name(), format!("invalid PATH entry: {e}"), None)
        })?;

        Ok(EnvDiff::set(
            ctx.env,
            "PATH",
            joined.to_string_lossy().into_owned(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::diff::EnvMap;
    use modenv_config::parse;
    use modenv_core::ModuleRef;
    use std::path::Path;

    fn run(config: &str, path: &str) -> EnvDiff {
        let doc = parse(config).unwrap();
        let module = ModuleRef::new("path");
        let mut env = EnvMap::new();
        env.insert("PATH".to_string(), path.to_string());
        let ctx = ModuleContext {
            module: &module,
            section: doc.section("path"),
            project_dir: Path::new("/work/project"),
            env: &env,
        };
        PathModule.activate(&ctx).unwrap()
    }

    #[test]
    fn test_prepend_and_append() {
        let diff = run(
            "[path]\nprepend=bin\nprepend=/opt/tools\nappend=/usr/local/extra\n",
            "/usr/bin:/bin",
        );
        assert_eq!(
            diff.next.get("PATH").map(String::as_str),
            Some("/work/project/bin:/opt/tools:/usr/bin:/bin:/usr/local/extra")
        );
        assert_eq!(diff.prev.get("PATH").map(String::as_str), Some("/usr/bin:/bin"));
    }

    #[test]
    fn test_present_entries_are_not_duplicated() {
        let diff = run("[path]\nprepend=/usr/bin\n", "/usr/bin:/bin");
        assert!(diff.is_empty());
    }
}
