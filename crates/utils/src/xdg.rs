use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for modenv
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/modenv or fallback
    pub fn config_dir() -> PathBuf {
        Self::base("XDG_CONFIG_HOME", ".config").join("modenv")
    }

    /// Get XDG_DATA_HOME/modenv or fallback
    pub fn data_dir() -> PathBuf {
        Self::base("XDG_DATA_HOME", ".local/share").join("modenv")
    }

    /// Get XDG_RUNTIME_DIR/modenv, falling back to a per-user directory in
    /// the system temp dir. Session state lives here and need not survive a
    /// reboot.
    pub fn runtime_dir() -> PathBuf {
        match env::var("XDG_RUNTIME_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("modenv"),
            _ => {
                let user = env::var("USER")
                    .or_else(|_| env::var("USERNAME"))
                    .unwrap_or_else(|_| "default".to_string());
                env::temp_dir().join(format!("modenv-{user}"))
            }
        }
    }

    /// Location of the optional settings file
    pub fn settings_file() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Default directory scanned for script modules
    pub fn module_dir() -> PathBuf {
        Self::config_dir().join("modules")
    }

    fn base(var: &str, home_relative: &str) -> PathBuf {
        match env::var(var) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .map(|home| home.join(home_relative))
                .unwrap_or_else(|| PathBuf::from(home_relative)),
        }
    }
}
