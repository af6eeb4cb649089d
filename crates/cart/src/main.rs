//! Storefront Cart CLI

use std::{io, process::ExitCode};

use storefront_cart::observability;

use crate::cli::Cli;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = observability::init_subscriber(&cli.config.logging) {
        report(&error);

        return ExitCode::FAILURE;
    }

    match cli.run(io::stdout().lock()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);

            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "errors are reported to the terminal")]
fn report(error: &dyn std::error::Error) {
    eprintln!("{error}");
}
