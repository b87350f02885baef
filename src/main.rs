#![forbid(unsafe_code)]

//! kload CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("kload: {e}");
        std::process::exit(e.exit_code());
    }
}
