use crate::diff::EnvDiff;
use crate::module::{Module, ModuleContext};
use modenv_core::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Creates every directory listed under `new`, relative to the project
/// directory. Existing directories are left alone; nothing is removed on
/// deactivation.
#[derive(Debug, Default)]
pub struct FoldersModule;

impl FoldersModule {
    fn target(ctx: &ModuleContext<'_>, entry: &str) -> PathBuf {
        let entry = ctx.interpolate(entry.trim());
        let path = PathBuf::from(entry);
        if path.is_absolute() {
            path
        } else {
            ctx.project_dir.join(path)
        }
    }
}

impl Module for FoldersModule {
    fn name(&self) -> &str {
        "folders"
    }

    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff> {
        for entry in ctx.values("new") {
            if entry.trim().is_empty() {
                continue;
            }
            let dir = Self::target(ctx, entry);
            if dir.is_dir() {
                tracing::trace!(path = %dir.display(), "folder already present");
                continue;
            }
            fs::create_dir_all(&dir)
                .map_err(|e| Error::file_system(&dir, "create folder", e))?;
            tracing::debug!(path = %dir.display(), "created folder");
        }
        Ok(EnvDiff::default())
    }
}
