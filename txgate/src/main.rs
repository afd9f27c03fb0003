use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use txgate::{datalink::DatalinkResolver, ShutdownReport, TransmitError, Transmitter};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = cli::Cli::parse();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(err = %e, "txgate failed");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();
}

async fn run(cli: cli::Cli) -> Result<ShutdownReport, TransmitError> {
    let template = cli.load_template()?;
    let options = cli.options();

    let tx = Transmitter::start(&DatalinkResolver::new(), &cli.iface, template, options)?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("interrupted, shutting down"),
            Err(e) => warn!(err = %e, "failed to listen for ctrl-c, shutting down"),
        },
        _ = tx.finished() => {}
    }

    tx.shutdown().await
}

fn exit_code(err: &TransmitError) -> u8 {
    match err {
        TransmitError::Config(_) => 2,
        TransmitError::Resolve(_) => 3,
        TransmitError::WorkerSpawn(_) => 4,
        TransmitError::WorkerJoin(_) => 1,
    }
}
