use super::{escape_bash_like, Shell};

pub struct ZshShell;

impl Shell for ZshShell {
    fn hook(&self, program: &str) -> String {
        format!(
            r#"export MODENV_SESSION="${{MODENV_SESSION:-$$}}"
_modenv_hook() {{
  trap -- '' SIGINT
  eval "$({program} export zsh)"
  trap - SIGINT
}}
typeset -ag precmd_functions
if [[ ${{precmd_functions[(ie)_modenv_hook]}} -gt ${{#precmd_functions}} ]]; then
  precmd_functions+=(_modenv_hook)
fi
typeset -ag chpwd_functions
if [[ ${{chpwd_functions[(ie)_modenv_hook]}} -gt ${{#chpwd_functions}} ]]; then
  chpwd_functions+=(_modenv_hook)
fi"#,
            program = escape_bash_like(program)
        )
    }

    fn export(&self, key: &str, value: &str) -> String {
        format!("export {key}={}", self.escape(value))
    }

    fn unset(&self, key: &str) -> String {
        format!("unset {key}")
    }

    fn escape(&self, s: &str) -> String {
        escape_bash_like(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zsh_export_and_unset() {
        assert_eq!(ZshShell.export("FOO", "bar baz"), "export FOO='bar baz'");
        assert_eq!(ZshShell.unset("FOO"), "unset FOO");
    }

    #[test]
    fn test_zsh_hook() {
        let hook = ZshShell.hook("modenv");
        assert!(hook.contains("eval \"$(modenv export zsh)\""));
        assert!(hook.contains("precmd_functions+=(_modenv_hook)"));
        assert!(hook.contains("chpwd_functions"));
    }
}
