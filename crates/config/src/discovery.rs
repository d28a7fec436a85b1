use modenv_core::{Error, Result, CONFIG_FILENAME};
use std::env;
use std::path::{Path, PathBuf};

/// Finds project configuration files by walking up the directory tree
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    file_name: String,
}

impl ConfigLocator {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Nearest configuration file at or above `start`
    pub fn find_config(&self, start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| self.config_in(dir))
    }

    /// Nearest configuration strictly above `project_dir`, used when a
    /// configuration chains onto its parent's
    pub fn parent_config(&self, project_dir: &Path) -> Option<PathBuf> {
        project_dir
            .parent()
            .and_then(|parent| self.find_config(parent))
    }

    fn config_in(&self, dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(&self.file_name);
        candidate.is_file().then_some(candidate)
    }
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self::new(CONFIG_FILENAME)
    }
}

pub fn current_directory() -> Result<PathBuf> {
    env::current_dir().map_err(|e| Error::file_system(".", "get current directory", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("project");
        let nested = project.join("sub").join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(".modenv"), "[env]\n").unwrap();
        fs::write(project.join(".modenv"), "[folders]\n").unwrap();
        (temp_dir, project, nested)
    }

    #[test]
    fn test_find_nearest_config() {
        let (_temp, project, nested) = layout();
        let locator = ConfigLocator::default();

        assert_eq!(
            locator.find_config(&nested),
            Some(project.join(".modenv"))
        );
        assert_eq!(
            locator.find_config(&project),
            Some(project.join(".modenv"))
        );
    }

    #[test]
    fn test_parent_config_skips_own_directory() {
        let (temp, project, _) = layout();
        let locator = ConfigLocator::default();

        assert_eq!(
            locator.parent_config(&project),
            Some(temp.path().join(".modenv"))
        );
    }

    #[test]
    fn test_directory_named_like_config_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".custom")).unwrap();
        let locator = ConfigLocator::new(".custom");
        assert_eq!(locator.find_config(temp_dir.path()), None);
    }
}
