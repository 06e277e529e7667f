mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compress, init, CompressArgs, InitArgs};
use tracing_subscriber::EnvFilter;

/// csspress - structural CSS optimizer
#[derive(Parser, Debug)]
#[command(name = "csspress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every pass (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default csspress.config.json
    Init(InitArgs),

    /// Compress a stylesheet or every stylesheet in a directory
    Compress(CompressArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Compress(args) => compress(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
