use crate::context::{absolute, App};
use modenv_config::{current_directory, ConfigDocument, ConfigLocator, ParseOptions, Parser};
use modenv_core::{Error, Result, MULTI_VALUE_SEPARATOR};
use modenv_security::Verification;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub fn execute(app: &App, file: Option<PathBuf>, json: bool) -> Result<i32> {
    let controller = app.controller()?;
    let settings = controller.settings();
    let file = match file {
        Some(file) => absolute(&file)?,
        None => {
            let locator = ConfigLocator::new(settings.config_file_name.clone());
            let cwd = current_directory()?;
            locator.find_config(&cwd).ok_or_else(|| {
                Error::configuration(format!(
                    "no {} in '{}' or any parent directory",
                    locator.file_name(),
                    cwd.display()
                ))
            })?
        }
    };

    // Command values run while parsing, so the file must pass its trust check first
    if let Verification::Bootstrapped = controller.integrity().verify(&file)? {
        tracing::info!(path = %file.display(), "trusting configuration on first use");
    }

    let document = Parser::new(ParseOptions {
        allow_commands: settings.allow_commands,
        working_dir: file.parent().map(Path::to_path_buf),
    })
    .parse_file(&file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", render(&document));
    }
    Ok(0)
}

/// Canonical text form: the load order as a comment, then every section
/// with repeated keys written out once per value
fn render(document: &ConfigDocument) -> String {
    let mut out = String::new();
    let order: Vec<String> = document
        .module_refs()
        .iter()
        .map(|module| module.full_name())
        .collect();
    let _ = writeln!(out, "# modules: {}", order.join(" "));

    for section in document.sections() {
        let _ = writeln!(out, "\n[{}]", section.name());
        for (key, value) in section.iter() {
            for part in value.split(MULTI_VALUE_SEPARATOR) {
                let _ = writeln!(out, "{key}={part}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use modenv_config::parse;

    #[test]
    fn test_render_expands_repeated_keys() {
        let document = parse("[path]\nprepend=bin\nprepend=tools\n[env]\nA=1\n").unwrap();
        let text = render(&document);

        assert!(text.starts_with("# modules: path env\n"));
        assert!(text.contains("[path]\nprepend=bin\nprepend=tools\n"));
        assert!(text.contains("[env]\nA=1\n"));
    }
}
