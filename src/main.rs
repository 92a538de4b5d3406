//! seeklat CLI entry point

use seeklat::config::cli::Cli;
use seeklat::error::exit_code_for;
use seeklat::target::block::PlatformSizer;
use seeklat::util::logger;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logger::init(cli.debug);

    match cli.into_config().and_then(|config| seeklat::run(&config, &PlatformSizer)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}
