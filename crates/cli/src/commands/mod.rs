use crate::context::App;
use clap::Subcommand;
use modenv_core::Result;
use std::path::PathBuf;

mod export;
mod hook;
mod lifecycle;
mod modules;
mod parse;
mod trust;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the prompt hook to evaluate from a shell rc file
    Hook {
        /// Shell type (bash, zsh, fish)
        shell: String,
    },

    /// Activate or deactivate for the current directory (called by the hook)
    Export {
        /// Shell type (bash, zsh, fish)
        shell: String,
    },

    /// Activate the configuration of a project directory
    Activate {
        /// Project directory, or any directory below it
        directory: Option<PathBuf>,

        /// Shell format of the emitted code (defaults to $SHELL)
        #[arg(short, long)]
        shell: Option<String>,
    },

    /// Deactivate a project directory, undoing every loaded module
    Deactivate {
        /// Project directory (defaults to the active one)
        directory: Option<PathBuf>,

        /// Shell format of the emitted code (defaults to $SHELL)
        #[arg(short, long)]
        shell: Option<String>,
    },

    /// Parse a configuration file and print the result
    Parse {
        /// Configuration file (defaults to the nearest one)
        file: Option<PathBuf>,

        /// Print the parsed document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record the current digest of a file, replacing any previous record
    Trust {
        file: PathBuf,
    },

    /// Check a file against its recorded digest
    Verify {
        file: PathBuf,
    },

    /// List the registered modules
    Modules,
}

impl Commands {
    /// Run the command, returning the process exit status
    pub fn execute(self, app: &App) -> Result<i32> {
        match self {
            Commands::Hook { shell } => hook::execute(&shell),
            Commands::Export { shell } => export::execute(app, &shell),
            Commands::Activate { directory, shell } => {
                lifecycle::activate(app, directory, shell.as_deref())
            }
            Commands::Deactivate { directory, shell } => {
                lifecycle::deactivate(app, directory, shell.as_deref())
            }
            Commands::Parse { file, json } => parse::execute(app, file, json),
            Commands::Trust { file } => trust::trust(app, &file),
            Commands::Verify { file } => trust::verify(app, &file),
            Commands::Modules => modules::execute(app),
        }
    }
}
