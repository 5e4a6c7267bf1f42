//! Process-wide tracing setup.
//!
//! Console output goes through `tracing_subscriber::fmt` (JSON or pretty) and,
//! when a search cluster is configured, every event is also shipped by the
//! [`search_sink`] layer.

pub mod search_sink;

use reqwest::Url;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogFormat;

pub use search_sink::{SearchSinkLayer, SearchSinkWorker, SinkStats};

/// Filter used when `RUST_LOG` is unset. Framework chatter is held at `warn`.
pub const DEFAULT_FILTER: &str =
    "info,actix_server=warn,actix_web=warn,diesel=warn,hyper=warn,reqwest=warn";

/// Failures while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to build search sink client: {0}")]
    SinkClient(#[from] reqwest::Error),
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

fn env_filter() -> Result<EnvFilter, ParseError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER),
    }
}

/// Install the global subscriber.
///
/// Returns the search sink worker when `sink_uri` is set; the caller must
/// spawn [`SearchSinkWorker::run`] on the runtime.
///
/// # Errors
/// Returns [`TelemetryError`] when the filter is invalid, the sink client
/// cannot be built, or a global subscriber is already installed.
pub fn init_tracing(
    format: LogFormat,
    sink_uri: Option<Url>,
) -> Result<Option<SearchSinkWorker>, TelemetryError> {
    let (sink_layer, worker) = match sink_uri {
        Some(uri) => {
            let (layer, worker) = search_sink::search_sink(uri)?;
            (Some(layer), Some(worker))
        }
        None => (None, None),
    };

    let json = matches!(format, LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });
    let pretty = matches!(format, LogFormat::Pretty).then(|| fmt::layer().pretty());

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(json)
        .with(pretty)
        .with(sink_layer)
        .try_init()?;

    Ok(worker)
}
