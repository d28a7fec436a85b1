use clap::Parser;
use modenv_config::FailurePolicy;
use std::process;

mod commands;
mod context;

use commands::Commands;
use context::App;

#[derive(Parser)]
#[command(name = "modenv")]
#[command(about = "Directory-scoped environment activator", long_about = None)]
#[command(version)]
struct Cli {
    /// Evaluate `cmd:` values in configuration files
    #[arg(long, global = true)]
    allow_commands: bool,

    /// What to do when a module fails (best-effort, fail-fast)
    #[arg(long, global = true, value_name = "POLICY")]
    failure_policy: Option<FailurePolicy>,

    /// Default log filter when MODENV_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    modenv_utils::logging::init(&cli.log_level).map_err(|e| eyre::eyre!(e))?;

    let app = App {
        allow_commands: cli.allow_commands,
        failure_policy: cli.failure_policy,
    };

    match cli.command.execute(&app) {
        Ok(code) => process::exit(code),
        Err(e) => {
            context::report(&e);
            process::exit(1);
        }
    }
}
