use super::{builtin, Module, ScriptModule};
use modenv_core::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maps base module names to their implementation.
///
/// The first registration of a name wins, so plugins discovered on the module
/// path shadow built-ins of the same name.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Script plugins from `module_path` (earlier directories first), then
    /// the built-ins
    pub fn discover(module_path: &[PathBuf]) -> Result<Self> {
        let mut registry = Self::new();
        for dir in module_path {
            registry.scan_dir(dir)?;
        }
        registry.register_builtins();
        Ok(registry)
    }

    /// Add a module; returns `false` if the name was already taken
    pub fn register(&mut self, module: Arc<dyn Module>) -> bool {
        if self.contains(module.name()) {
            tracing::debug!(module = module.name(), "module already registered, skipping");
            return false;
        }
        self.modules.push(module);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn register_builtins(&mut self) {
        for module in builtin::all() {
            self.register(module);
        }
    }

    fn scan_dir(&mut self, dir: &Path) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(dir = %dir.display(), "module directory does not exist");
                return Ok(());
            }
            Err(e) => return Err(Error::file_system(dir, "read module directory", e)),
        };

        let mut plugins: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sh"))
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_string();
                is_module_name(&name).then_some((name, path))
            })
            .collect();
        plugins.sort();

        for (name, path) in plugins {
            match ScriptModule::load(&name, &path) {
                Ok(module) => {
                    if self.register(Arc::new(module)) {
                        tracing::debug!(module = %name, path = %path.display(), "discovered script module");
                    }
                }
                Err(e) => tracing::warn!(module = %name, "skipping unreadable module: {e}"),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

/// Names usable as a shell function
fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
