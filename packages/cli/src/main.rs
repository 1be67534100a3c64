mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, render, CheckArgs, InitArgs, RenderArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// genui CLI - render and check generated UI documents
#[derive(Parser, Debug)]
#[command(name = "genui")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./genui.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a config file and an example document
    Init(InitArgs),

    /// Render a document to HTML or virtual DOM JSON
    Render(RenderArgs),

    /// Validate documents, compile their methods and try a render
    Check(CheckArgs),
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Render(args) => {
            let config = Config::load(&cwd, cli.config.as_deref())?;
            render(args, &config, &cwd)
        }
        Command::Check(args) => {
            let config = Config::load(&cwd, cli.config.as_deref())?;
            check(args, &config, &cwd)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
