use modenv_core::Result;
use modenv_utils::{append_line_atomic, read_optional, remove_if_exists};
use std::path::{Path, PathBuf};

/// Session-scoped record of the modules loaded for one project directory,
/// one name per line in load order.
///
/// The file outlives the process that wrote it: the next activation of the
/// same directory finds a leftover ledger and unwinds it first.
#[derive(Debug, Clone)]
pub struct LoadedModulesLedger {
    path: PathBuf,
}

impl LoadedModulesLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Recorded module names in load order
    pub fn entries(&self) -> Result<Vec<String>> {
        Ok(read_optional(&self.path)?
            .map(|content| {
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Names in deactivation order (last loaded first)
    pub fn reversed(&self) -> Result<Vec<String>> {
        let mut entries = self.entries()?;
        entries.reverse();
        Ok(entries)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.entries()?.iter().any(|entry| entry == name))
    }

    /// Append `name` unless it is already recorded; returns whether it was added
    pub fn record(&self, name: &str) -> Result<bool> {
        if self.contains(name)? {
            tracing::debug!(module = %name, "module already in ledger");
            return Ok(false);
        }
        append_line_atomic(&self.path, name)?;
        Ok(true)
    }

    /// Remove the ledger file
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)?;
        Ok(())
    }
}
