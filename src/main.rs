use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use seriorch::cli::commands::{cmd_build, cmd_init, cmd_inject, cmd_unravel};
use seriorch::cli::config::{Cli, Commands, init_logging, resolve_config};

fn run(cli: Cli) -> seriorch::Result<()> {
    let project = Path::new(".");
    let config = resolve_config(cli.config.as_deref(), project)?;

    match cli.command {
        Commands::Init => cmd_init(project, &config),
        Commands::Unravel { file, watch } => cmd_unravel(project, &file, &config, watch),
        Commands::Build { watch } => cmd_build(project, &config, watch),
        Commands::Inject { output } => cmd_inject(project, &config, output.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
