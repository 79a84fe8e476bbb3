//! Gauntlet CLI - Main Entry Point
//!
//! Selects test files by glob, runs them through the suite engine and
//! reports the outcome. Exit status: 0 all passed, 1 a test failed,
//! 2 setup or configuration failed.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{list, stage, test};

/// Gauntlet - unit and integration test runner for web applications
#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Application root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to gauntlet.toml in the application root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, stage and run tests
    Test(test::TestArgs),

    /// Compile the application and build the unit test root only
    Stage,

    /// Show how the selected files are classified
    List(list::ListArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    // Anything that escapes a command is a setup or configuration problem;
    // test failures exit from inside `test` with EXIT_TEST_FAILED.
    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(commands::EXIT_SETUP_FAILED);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = commands::Context::load(&cli.root, cli.config.as_deref(), cli.format)?;

    match cli.command {
        Commands::Test(args) => test::execute(args, ctx).await?,
        Commands::Stage => stage::execute(ctx).await?,
        Commands::List(args) => list::execute(args, ctx)?,
    }

    Ok(())
}
