//! Structured-text parser for project configuration files
//!
//! The format is line oriented:
//!
//! ```text
//! # comment
//! [folders]
//! new = tmp/a
//! new = tmp/b
//!
//! [aws:prod]
//! region=eu-west-1
//! ```
//!
//! Blank and `#` lines are skipped, `[name]` / `[name:variant]` open a
//! section, `key=value` (at most one space on either side of `=`) adds to the
//! current section, and anything else is ignored.

mod command;
mod document;
mod value;

pub use command::{CommandRunner, ShellCommandRunner};
pub use document::{ConfigDocument, Section};
pub use value::{escape_references, unescape_references, ValueExpr};

use modenv_core::{Error, ModuleRef, Result, COMMENT_MARKER, VARIANT_KEY_JOINER};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[([^\[\]]+)\]\s*$").expect("section pattern is valid"));

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\s=\[\]]+) ?= ?(.*)$").expect("key-value pattern is valid"));

/// Options controlling value evaluation
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Evaluate `cmd:` values. Off by default: a command value is arbitrary
    /// code execution sourced from the configuration file.
    pub allow_commands: bool,
    /// Directory commands run in
    pub working_dir: Option<PathBuf>,
}

/// Parse configuration text with default options (command values disabled)
pub fn parse(text: &str) -> Result<ConfigDocument> {
    Parser::new(ParseOptions::default()).parse(text)
}

/// Configuration parser
pub struct Parser {
    options: ParseOptions,
    runner: Box<dyn CommandRunner>,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        let runner = match &options.working_dir {
            Some(dir) => ShellCommandRunner::in_dir(dir),
            None => ShellCommandRunner::new(),
        };
        Self {
            options,
            runner: Box::new(runner),
        }
    }

    /// Replace the runner used for `cmd:` values
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Read and parse a configuration file
    pub fn parse_file(&self, path: &Path) -> Result<ConfigDocument> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read configuration", e))?;
        tracing::debug!(path = %path.display(), "parsing configuration");
        self.parse(&text)
    }

    pub fn parse(&self, text: &str) -> Result<ConfigDocument> {
        let mut document = ConfigDocument::new();
        let mut current: Option<ModuleRef> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim_end_matches('\r');
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }

            if let Some(caps) = SECTION_HEADER.captures(line) {
                let header = ModuleRef::parse(&normalize_section_name(&caps[1]));
                document.open(header.clone());
                current = Some(header);
                continue;
            }

            let Some(caps) = KEY_VALUE.captures(line) else {
                tracing::trace!(line = index + 1, "ignoring unrecognised line");
                continue;
            };

            let Some(header) = &current else {
                return Err(Error::no_active_section(index + 1, line));
            };

            let key = match &header.variant {
                Some(variant) => format!("{variant}{VARIANT_KEY_JOINER}{}", &caps[1]),
                None => caps[1].to_string(),
            };
            let value = self.resolve(&key, &caps[2]);

            if let Some(section) = document.section_mut(header.base()) {
                section.accumulate(key, value);
            }
        }

        Ok(document)
    }

    fn resolve(&self, key: &str, raw: &str) -> String {
        match ValueExpr::classify(raw) {
            ValueExpr::Literal(value) => value,
            ValueExpr::Interpolated(value) => escape_references(&value),
            ValueExpr::CommandSubstitution(command) => {
                if !self.options.allow_commands {
                    tracing::warn!(
                        key = %key,
                        "command values are disabled; set MODENV_ALLOW_COMMANDS=1 to evaluate them"
                    );
                    return String::new();
                }
                match self.runner.run(&command) {
                    Ok(output) => output,
                    Err(e) => {
                        tracing::warn!(key = %key, "command value failed, using empty value: {e}");
                        String::new()
                    }
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

fn normalize_section_name(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}
