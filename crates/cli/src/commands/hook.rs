use crate::context::resolve_shell;
use modenv_core::{Error, Result};
use std::env;

pub fn execute(shell: &str) -> Result<i32> {
    let shell = resolve_shell(Some(shell))?;
    let program = env::current_exe()
        .map_err(|e| Error::file_system("modenv", "locate current executable", e))?;
    println!("{}", shell.hook(&program.display().to_string()));
    Ok(0)
}
