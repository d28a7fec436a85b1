use super::{escape_bash_like, Shell};

pub struct BashShell;

impl Shell for BashShell {
    fn hook(&self, program: &str) -> String {
        format!(
            r#"export MODENV_SESSION="${{MODENV_SESSION:-$$}}"
_modenv_hook() {{
  local previous_exit_status=$?
  trap -- '' SIGINT
  eval "$({program} export bash)"
  trap - SIGINT
  return $previous_exit_status
}}

if [[ ";${{PROMPT_COMMAND[*]:-}};" != *";_modenv_hook;"* ]]; then
  if [[ "$(declare -p PROMPT_COMMAND 2>&1)" == "declare -a"* ]]; then
    PROMPT_COMMAND+=(_modenv_hook)
  else
    PROMPT_COMMAND="_modenv_hook${{PROMPT_COMMAND:+;$PROMPT_COMMAND}}"
  fi
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
