use anyhow::Result;
use std::fmt::Display;
use tracing::{error, warn};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{prelude::*, EnvFilter};

use super::conf::LogFormat;

// A simple way to log without interrupting fluency
pub trait LogMe<T> {
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T>;
}

// Will log a warning in case of error
// WARN {context_msg}: {cause}
impl<T, Error: Into<anyhow::Error> + Display + Send + Sync + 'static> LogMe<T>
    for Result<T, Error>
{
    fn log_warn<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let ae: anyhow::Error = e.into();
            let ae = ae.context(context_msg);
            warn!("{:#}", ae);
            ae
        })
    }

    fn log_error<C: Display + Send + Sync + 'static>(self, context_msg: C) -> anyhow::Result<T> {
        self.map_err(|e| {
            let ae: anyhow::Error = e.into();
            let ae = ae.context(context_msg);
            error!("{:#}", ae);
            ae
        })
    }
}

pub enum TracingMode {
    /// Human readable lines, for running the API locally
    Full,
    /// JSON lines, for running the API in a container
    Json,
}

impl From<&LogFormat> for TracingMode {
    fn from(format: &LogFormat) -> Self {
        match format {
            LogFormat::Full => TracingMode::Full,
            LogFormat::Json => TracingMode::Json,
        }
    }
}

/// Setup tracing - stdout subscriber
/// stdout defaults to INFO, sqlx to WARN unless RUST_LOG mentions it, and
/// request/response traces to DEBUG unless RUST_LOG mentions tower_http.
pub fn setup_tracing(mode: TracingMode) -> Result<()> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let var = std::env::var("RUST_LOG").unwrap_or_default();
    if !var.contains("sqlx") {
        filter = filter.add_directive("sqlx=warn".parse()?);
    }
    if !var.contains("tower_http") {
        // API request/response debug tracing
        filter = filter.add_directive("tower_http::trace=debug".parse()?);
    }

    // Can't use match inline because these are different return types
    match mode {
        TracingMode::Full => register_global_subscriber(filter, tracing_subscriber::fmt::layer()),
        TracingMode::Json => register_global_subscriber(
            filter,
            tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().json()),
        ),
    };

    Ok(())
}

fn register_global_subscriber<T, S>(filter: EnvFilter, fmt_layer: T)
where
    S: Subscriber,
    T: tracing_subscriber::Layer<S> + Send + Sync,
    tracing_subscriber::filter::Filtered<T, tracing_subscriber::EnvFilter, S>:
        tracing_subscriber::Layer<tracing_subscriber::Registry>,
{
    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}
