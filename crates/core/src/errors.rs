use miette::Diagnostic;
use std::path::PathBuf;

/// Result type alias for modenv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for modenv operations
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    /// Content digest of a trusted file no longer matches its record
    #[error("'{}' has been modified since it was trusted (record: '{}')", .file.display(), .record.display())]
    #[diagnostic(
        code(modenv::tampered),
        help("review the file, then remove the stored digest (or run `modenv trust <file>`) and retry")
    )]
    Tampered { file: PathBuf, record: PathBuf },

    /// A key=value line appeared before any section header
    #[error("line {line}: '{content}' is not inside a [section]")]
    #[diagnostic(
        code(modenv::parse::no_active_section),
        help("add a [module] header above the first key=value line")
    )]
    NoActiveSection { line: usize, content: String },

    /// A configured module has no backing implementation
    #[error("module '{module}' was not found (configured in '{}')", .config.display())]
    #[diagnostic(
        code(modenv::module_not_found),
        help("fix or remove the offending [section] in the configuration file")
    )]
    ModuleNotFound { module: String, config: PathBuf },

    /// A module's own activation logic signaled failure
    #[error("{}", format_activation_error(.module, .message, .exit_code))]
    #[diagnostic(
        code(modenv::activation),
        help("fix the module's configuration entry or remove it")
    )]
    Activation {
        module: String,
        message: String,
        exit_code: Option<i32>,
    },

    /// Command execution errors
    #[error("command '{command}' failed: {message}")]
    #[diagnostic(code(modenv::command))]
    CommandExecution {
        command: String,
        message: String,
        exit_code: Option<i32>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    #[diagnostic(code(modenv::configuration))]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{}': {source}", .path.display())]
    #[diagnostic(code(modenv::file_system))]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    #[diagnostic(code(modenv::json))]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_activation_error(module: &str, message: &str, exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("module '{module}' failed to activate (exit code {code}): {message}"),
        None => format!("module '{module}' failed to activate: {message}"),
    }
}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a tamper error for `file` whose trust record lives at `record`
    #[must_use]
    pub fn tampered(file: impl Into<PathBuf>, record: impl Into<PathBuf>) -> Self {
        Error::Tampered {
            file: file.into(),
            record: record.into(),
        }
    }

    /// Create a structural parse error
    #[must_use]
    pub fn no_active_section(line: usize, content: impl Into<String>) -> Self {
        Error::NoActiveSection {
            line,
            content: content.into(),
        }
    }

    /// Create a module-not-found error pointing at the configuration entry
    #[must_use]
    pub fn module_not_found(module: impl Into<String>, config: impl Into<PathBuf>) -> Self {
        Error::ModuleNotFound {
            module: module.into(),
            config: config.into(),
        }
    }

    /// Create an activation error
    #[must_use]
    pub fn activation(
        module: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::Activation {
            module: module.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Create a command execution error
    #[must_use]
    pub fn command_execution(
        command: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::CommandExecution {
            command: command.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Integrity and structural errors abort an activation before any module
    /// is touched; everything else is accumulated per module.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Tampered { .. } | Error::NoActiveSection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tampered_message_names_both_paths() {
        let err = Error::tampered("project/.modenv", "files/project/.modenv.sha256");
        let msg = err.to_string();
        assert!(msg.contains("project/.modenv"));
        assert!(msg.contains("files/project/.modenv.sha256"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_module_errors_are_soft() {
        assert!(!Error::module_not_found("folders", ".modenv").is_fatal());
        assert!(!Error::activation("path", "boom", Some(1)).is_fatal());
        assert!(Error::no_active_section(1, "a=b").is_fatal());
    }

    #[test]
    fn test_activation_message_includes_exit_code() {
        let err = Error::activation("secrets", "vault unreachable", Some(2));
        assert_eq!(
            err.to_string(),
            "module 'secrets' failed to activate (exit code 2): vault unreachable"
        );
        let err = Error::activation("secrets", "vault unreachable", None);
        assert_eq!(
            err.to_string(),
            "module 'secrets' failed to activate: vault unreachable"
        );
    }
}
