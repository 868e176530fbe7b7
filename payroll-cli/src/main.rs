use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};

use payroll_cli::cli::{self, Cli};
use payroll_cli::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.resolve_config().context("failed to load configuration")?;

    logging::init_logging(&config.logging.level);
    if let Some(path) = &config.logging.file {
        // Console logging still works without the file.
        if let Err(error) = logging::enable_file_logging(path) {
            warn!(%error, "file logging disabled");
        }
    }
    debug!(?config, "configuration resolved");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(&cli.command, &config, &mut out).await?;
    out.flush()?;

    Ok(())
}
