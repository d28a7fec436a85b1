//! Modules compiled into the binary

mod env;
mod folders;
mod path;

pub use env::EnvModule;
pub use folders::FoldersModule;
pub use path::PathModule;

use super::Module;
use std::sync::Arc;

/// Every built-in module, in registration order
pub fn all() -> Vec<Arc<dyn Module>> {
    vec![
        Arc::new(FoldersModule),
        Arc::new(PathModule),
        Arc::new(EnvModule),
    ]
}
