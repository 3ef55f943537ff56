// src/main.rs — romci entry point

use clap::Parser;

use romci::cli::run::run_build;
use romci::cli::Cli;
use romci::infra::config::Config;
use romci::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("info");

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    // Falls back to defaults if no config file exists
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    let outcome = run_build(&cli, &config).await?;
    Ok(outcome.exit_code())
}
