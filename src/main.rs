//! Main entry point for the zlook CLI application.
//!
//! Archive contents and extracted entries go to stdout; diagnostics go to
//! stderr through `tracing`.

use anyhow::Result;
use clap::Parser;
use tokio::io::BufWriter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use zlook::{Cli, Inspector};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.into_config();
    config.validate()?;

    let inspector = Inspector::new(config);
    tracing::debug!(
        max_depth = inspector.config().max_depth,
        archive_types = %inspector.archive_types(),
        "inspecting {} archive(s)",
        inspector.config().paths.len()
    );

    let mut stdout = BufWriter::new(tokio::io::stdout());
    inspector.run(&mut stdout).await
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
