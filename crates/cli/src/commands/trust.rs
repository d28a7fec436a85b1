use crate::context::{absolute, App};
use modenv_core::Result;
use modenv_security::Verification;
use std::path::Path;

/// Accept the current content of `file`, the corrective action after a
/// tamper report
pub fn trust(app: &App, file: &Path) -> Result<i32> {
    let file = absolute(file)?;
    let controller = app.controller()?;
    let integrity = controller.integrity();

    let previous = integrity.stored_digest(&file)?;
    let digest = integrity.trust(&file)?;
    match previous {
        Some(old) if old == digest => tracing::info!(file = %file.display(), "already trusted"),
        Some(_) => tracing::info!(file = %file.display(), "trust record replaced"),
        None => tracing::info!(file = %file.display(), "trust record created"),
    }
    println!("{digest}  {}", file.display());
    Ok(0)
}

/// Run the integrity check alone; a mismatch is reported as an error
pub fn verify(app: &App, file: &Path) -> Result<i32> {
    let file = absolute(file)?;
    let controller = app.controller()?;

    match controller.integrity().verify(&file)? {
        Verification::Bootstrapped => println!("bootstrapped  {}", file.display()),
        Verification::Matched => println!("ok  {}", file.display()),
    }
    Ok(0)
}
