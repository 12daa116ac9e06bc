//! sumwire - one-shot checksum exchange client.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sumwire_client::output::{print_report, OutputFormat};
use sumwire_client::ring_buffer::DEFAULT_CAPACITY;
use sumwire_client::transport::{DEFAULT_HOST, DEFAULT_PORT};
use sumwire_client::Client;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// sumwire - answer the server's RES frame with its payload checksum
#[derive(Parser, Debug)]
#[command(name = "sumwire")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ring buffer capacity in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Maximum preamble bytes before the marker
    #[arg(long, default_value_t = 65536)]
    max_preamble: u64,

    /// Seconds to wait for the marker (0 disables the bound)
    #[arg(long, default_value_t = 30)]
    scan_timeout_secs: u64,

    /// Socket read/write timeout in seconds (0 disables the bound)
    #[arg(long, default_value_t = 30)]
    io_timeout_secs: u64,

    /// Print a JSON report instead of the bare response line
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let client = Client::builder()
        .host(cli.host.clone())
        .port(cli.port)
        .capacity(cli.capacity)
        .max_preamble(cli.max_preamble)
        .scan_timeout(secs(cli.scan_timeout_secs))
        .io_timeout(secs(cli.io_timeout_secs))
        .build()
        .context("invalid client configuration")?;

    let exchange = client
        .run_async()
        .await
        .with_context(|| format!("exchange with {}:{} failed", cli.host, cli.port))?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Line
    };
    print_report(&exchange, format).context("failed to write result")?;
    Ok(())
}
