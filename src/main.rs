use std::process::ExitCode;

use clap::Parser;

use htmap::cli::{self, CliArgs};
use htmap::logger;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init(args.verbose);

    cli::run(args)
}
