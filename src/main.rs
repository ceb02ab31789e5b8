//! Main entry point for reconcyl CLI

use clap::Parser;
use reconcyl::cli::Cli;
use reconcyl::commands::execute_command;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still overrides the default level
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    // Execute the command
    if let Err(e) = execute_command(cli.command, cli.store.as_deref(), cli.config.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
