use bindmap::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{count, locate, normalize, validate},
    utils::{handle_error_and_exit, Result},
};
use clap::Parser;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Normalize(_) => "normalize",
        Command::Locate(_) => "locate",
        Command::Count(_) => "count",
        Command::Validate(_) => "validate",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Normalize(args) => normalize::normalize(args)?,
        Command::Locate(args) => locate::locate(args)?,
        Command::Count(args) => count::count(args)?,
        Command::Validate(args) => validate::validate(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
