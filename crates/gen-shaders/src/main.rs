mod cli;
mod paths;
mod run;

use std::process::ExitCode;

use anyhow::Result;

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing(cli.verbose);
    run::run(cli)
}
