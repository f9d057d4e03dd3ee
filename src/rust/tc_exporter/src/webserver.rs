use crate::metrics::{Exporter, Group};
use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tc_collector::{InterfaceLookup, TcSource};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

type SharedExporter<S, L> = Arc<Exporter<S, L>>;

/// Serves the exporter on all addresses at `port` until the listener
/// fails.
pub async fn run<S, L>(exporter: SharedExporter<S, L>, port: u16) -> Result<()>
where
  S: TcSource + Send + Sync + 'static,
  L: InterfaceLookup + Send + Sync + 'static,
{
  let listen_address = SocketAddr::from(([0, 0, 0, 0], port));
  let listener = TcpListener::bind(listen_address).await?;

  info!("Listening on: [{listen_address}]");
  axum::serve(listener, router(exporter)).await?;
  Ok(())
}

/// Routes `/metrics`, `/params` and an index page to `exporter`.
pub fn router<S, L>(exporter: SharedExporter<S, L>) -> Router
where
  S: TcSource + Send + Sync + 'static,
  L: InterfaceLookup + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(index))
    .route("/metrics", get(stats::<S, L>))
    .route("/params", get(params::<S, L>))
    .with_state(exporter)
}

async fn index() -> &'static str {
  "tc exporter\n\n/metrics  class and qdisc counters\n/params   class rates and qdisc options\n"
}

async fn stats<S, L>(State(exporter): State<SharedExporter<S, L>>) -> Response
where
  S: TcSource + Send + Sync + 'static,
  L: InterfaceLookup + Send + Sync + 'static,
{
  scrape(exporter, Group::Stats).await
}

async fn params<S, L>(State(exporter): State<SharedExporter<S, L>>) -> Response
where
  S: TcSource + Send + Sync + 'static,
  L: InterfaceLookup + Send + Sync + 'static,
{
  scrape(exporter, Group::Params).await
}

/// Runs `tc` on the blocking pool; it can take a while on large trees.
async fn scrape<S, L>(exporter: SharedExporter<S, L>, group: Group) -> Response
where
  S: TcSource + Send + Sync + 'static,
  L: InterfaceLookup + Send + Sync + 'static,
{
  match tokio::task::spawn_blocking(move || exporter.scrape(group)).await {
    Ok(Ok(body)) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
    Ok(Err(e)) => {
      warn!("Scrape of {group:?} failed: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
    }
    Err(e) => {
      error!("Scrape of {group:?} panicked: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
    }
  }
}
