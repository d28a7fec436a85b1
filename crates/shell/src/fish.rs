use super::Shell;

pub struct FishShell;

impl Shell for FishShell {
    fn hook(&self, program: &str) -> String {
        format!(
            r#"set -q MODENV_SESSION; or set -gx MODENV_SESSION $fish_pid
function _modenv_hook --on-event fish_prompt --on-variable PWD --description 'modenv hook'
  set -l prev_status $status
  {program} export fish | source
  return $prev_status
end"#,
            program = self.escape(program)
        )
    }

    fn export(&self, key: &str, value: &str) -> String {
        format!("set -gx {key} {}", self.escape(value))
    }

    fn unset(&self, key: &str) -> String {
        format!("set -e {key}")
    }

    fn escape(&self, s: &str) -> String {
        if s.is_empty() {
            return "''".to_string();
        }

        let needs_quotes = s.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '$' | '&' | '|' | '<' | '>' | '(' | ')' | '{' | '}' | '[' | ']' | '*' | '?'
                        | ';' | '"' | '\'' | '\\' | '#' | '~' | '%'
                )
        });
        if !needs_quotes {
            return s.to_string();
        }

        let mut result = String::with_capacity(s.len() + 2);
        result.push('\'');
        for c in s.chars() {
            match c {
                '\'' => result.push_str("\\'"),
                '\\' => result.push_str("\\\\"),
                _ => result.push(c),
            }
        }
        result.push('\'');
        result
    }
}
