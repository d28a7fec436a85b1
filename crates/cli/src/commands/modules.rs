use crate::context::App;
use modenv_core::Result;

pub fn execute(app: &App) -> Result<i32> {
    let controller = app.controller()?;
    for module in controller.registry().iter() {
        match module.implementation() {
            Some(path) => println!("{}\t{}", module.name(), path.display()),
            None => println!("{}\tbuiltin", module.name()),
        }
    }
    Ok(0)
}
