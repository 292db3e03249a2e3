//! CLI Entry Point for socket-instrument
//!
//! Serves one emulated instrument on a TCP port until interrupted.
//!
//! # Usage
//!
//! Emulate an Innco rotary disc on its usual port:
//! ```bash
//! socket-instrument rotary-disc
//! ```
//!
//! Emulate a Vötsch Vc chamber on a non-standard port, with noisy logs:
//! ```bash
//! SOCKET_INSTRUMENT_LOG_LEVEL=debug socket-instrument vc --port 2050
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use socket_instrument::clock::SystemClock;
use socket_instrument::config::Settings;
use socket_instrument::instruments::InstrumentKind;
use socket_instrument::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "socket-instrument")]
#[command(about = "TCP emulators for lab instruments", long_about = None)]
struct Cli {
    /// Instrument family to emulate
    instrument: InstrumentKind,

    /// Offset in degrees added to every positioner move command
    #[arg(long)]
    offset: Option<f64>,

    /// Port to listen on (default: the family's customary port)
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long)]
    listen: Option<String>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.validate()?;

    init_tracing(&settings.log_level);

    // Flags win over file and environment.
    let offset = cli.offset.or(settings.offset).unwrap_or(0.0);
    let host = cli.listen.unwrap_or(settings.listen.host);
    let port = cli
        .port
        .or(settings.listen.port)
        .unwrap_or_else(|| cli.instrument.default_port());

    let instrument = cli.instrument.build(Arc::new(SystemClock), offset)?;
    info!("Emulating {} with offset {}", instrument.name(), offset);

    let server = Server::bind(
        &format!("{host}:{port}"),
        instrument,
        cli.instrument.response_eol(),
    )
    .await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
