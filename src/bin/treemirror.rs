//! Treemirror CLI Binary
//!
//! Command-line interface for one-way directory mirroring.

use clap::Parser;
use std::process;
use treemirror::logging::init_logging;
use treemirror::tooling::cli::{Cli, CliContext};

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&context.config().logging, context.log_file()) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute(&cli.command) {
        Ok(outcome) => {
            println!("{}", outcome.output);
            if !outcome.success {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
