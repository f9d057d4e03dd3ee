mod metrics;
mod webserver;

use anyhow::Result;
use clap::Parser;
use metrics::Exporter;
use std::path::PathBuf;
use std::sync::Arc;
use tc_collector::{Collector, LinuxInterfaces, TcCommand, DEFAULT_TC};
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Exports Linux tc class and qdisc statistics for Prometheus", long_about = None)]
struct Args {
  /// Port to listen on
  #[arg(short, long, default_value_t = 9096)]
  port: u16,

  /// Path to the tc binary
  #[arg(long, default_value = DEFAULT_TC)]
  tc_binary: PathBuf,

  /// Interfaces to monitor. Interfaces that don't exist yet are
  /// skipped until they appear.
  #[arg(required = true, value_name = "INTERFACE")]
  interfaces: Vec<String>,
}

/// Console logging, with the level taken from RUST_LOG.
pub fn set_console_logging() -> anyhow::Result<()> {
  let level = if let Ok(level) = std::env::var("RUST_LOG") {
    match level.to_lowercase().as_str() {
      "trace" => LevelFilter::TRACE,
      "debug" => LevelFilter::DEBUG,
      "info" => LevelFilter::INFO,
      "warn" => LevelFilter::WARN,
      "error" => LevelFilter::ERROR,
      _ => LevelFilter::WARN,
    }
  } else {
    LevelFilter::WARN
  };

  let subscriber = tracing_subscriber::fmt()
    .with_max_level(level)
    .compact()
    .with_file(true)
    .with_line_number(true)
    .with_target(false)
    .finish();

  tracing::subscriber::set_global_default(subscriber)?;
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  // Usage errors exit here, before anything else starts
  let args = Args::parse();
  set_console_logging()?;

  info!("tc exporter starting, using {}", args.tc_binary.display());
  let collector = Collector::new(
    TcCommand::new(args.tc_binary),
    LinuxInterfaces,
    args.interfaces,
  );
  info!("Monitoring interfaces: {:?}", collector.interfaces());
  let exporter = Arc::new(Exporter::new(collector)?);

  webserver::run(exporter, args.port).await
}
