mod cli;
mod control;
mod defaults;
mod loader;
mod plan;
mod report;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Plan(args) => plan::run(args),
        Command::Run(args) => run::run(args),
    }
}
