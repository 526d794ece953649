#[macro_use]
extern crate log;

use std::process::ExitCode;

use clap::Parser;
use kplexrs::config::{self, Cli};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = match config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match kplexrs::supervisor::run(config) {
        Ok(()) => {
            info!("kplexrs: shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("kplexrs: {}", e);
            ExitCode::FAILURE
        }
    }
}
