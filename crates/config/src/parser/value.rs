use modenv_core::COMMAND_PREFIX;
use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\{[A-Za-z_][A-Za-z0-9_]*\}|[A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable reference pattern is valid")
});

/// Raw textual value of a `key=value` line, classified before storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    /// Used as-is
    Literal(String),
    /// `cmd:<command>`: replaced by the command's standard output
    CommandSubstitution(String),
    /// Contains `$VAR`/`${VAR}`; stored escaped so interpolation happens in
    /// the consuming module, not here
    Interpolated(String),
}

impl ValueExpr {
    pub fn classify(raw: &str) -> Self {
        if let Some(command) = raw.strip_prefix(COMMAND_PREFIX) {
            ValueExpr::CommandSubstitution(command.to_string())
        } else if VARIABLE_REFERENCE.is_match(raw) {
            ValueExpr::Interpolated(raw.to_string())
        } else {
            ValueExpr::Literal(raw.to_string())
        }
    }
}

/// Prefix every unescaped variable reference with a backslash
pub fn escape_references(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 4);
    let mut last = 0;
    for found in VARIABLE_REFERENCE.find_iter(value) {
        let start = found.start();
        escaped.push_str(&value[last..start]);
        if !value[..start].ends_with('\\') {
            escaped.push('\\');
        }
        escaped.push_str(found.as_str());
        last = found.end();
    }
    escaped.push_str(&value[last..]);
    escaped
}

/// Inverse of [`escape_references`]
pub fn unescape_references(value: &str) -> String {
    value.replace("\\$", "$")
}
