/// Constants used throughout the modenv codebase
// Configuration file
pub const CONFIG_FILENAME: &str = ".modenv";

// Configuration format tokens
pub const COMMENT_MARKER: char = '#';
pub const VARIANT_DELIMITER: char = ':';
pub const VARIANT_KEY_JOINER: char = ',';
pub const COMMAND_PREFIX: &str = "cmd:";

/// Joins the values of a key that is repeated inside one section (ASCII unit
/// separator). Consumers split on it to recover the list.
pub const MULTI_VALUE_SEPARATOR: &str = "\u{1f}";

/// Reserved section holding document-level options rather than a module.
pub const DEFAULT_SECTION: &str = "default";

// Environment variable names
pub const MODENV_FILE_VAR: &str = "MODENV_FILE";
pub const MODENV_DATA_DIR_VAR: &str = "MODENV_DATA_DIR";
pub const MODENV_RUNTIME_DIR_VAR: &str = "MODENV_RUNTIME_DIR";
pub const MODENV_MODULE_PATH_VAR: &str = "MODENV_MODULE_PATH";
pub const MODENV_ALLOW_COMMANDS_VAR: &str = "MODENV_ALLOW_COMMANDS";
pub const MODENV_FAILURE_POLICY_VAR: &str = "MODENV_FAILURE_POLICY";
pub const MODENV_VERIFY_SELF_VAR: &str = "MODENV_VERIFY_SELF";
pub const MODENV_SESSION_VAR: &str = "MODENV_SESSION";
pub const MODENV_LOG_VAR: &str = "MODENV_LOG";

/// Exported into the shell while an environment is active
pub const MODENV_DIR_VAR: &str = "MODENV_DIR";

/// Prefix shared by the transient variables handed to script modules
pub const SCAFFOLDING_PREFIX: &str = "MODENV_";

// Default shell
pub const DEFAULT_SHELL: &str = "bash";

// Ledger and session files
pub const LEDGER_FILENAME: &str = "loaded_modules";
pub const SESSION_FILENAME: &str = "session.json";
pub const DIGEST_EXTENSION: &str = "sha256";
