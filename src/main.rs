use anyhow::Result;
use clap::Parser;
use tracing::Level;

use linha::presentation::cli::{self, Cli};

fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let code = cli::run(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
