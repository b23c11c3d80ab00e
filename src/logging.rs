//! Opt-in tracing subscriber setup for binaries embedding the pipeline.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{Layer, filter::FilterFn, layer::SubscriberExt, util::SubscriberInitExt};

fn level_from_env() -> LevelFilter {
    let fallback = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    match std::env::var("LOG_LEVEL") {
        Ok(value) => LevelFilter::from_str(&value).unwrap_or_else(|_| {
            eprintln!("Unrecognized LOG_LEVEL `{value}`, using {fallback}");
            fallback
        }),
        Err(_) => fallback,
    }
}

/// Install a compact subscriber scoped to this crate's events.
///
/// The level defaults to `INFO` (`TRACE` in debug builds), overridable
/// with the `LOG_LEVEL` environment variable. Intended for binaries and
/// demos; libraries embedding this crate should install their own
/// subscriber instead.
pub fn init() {
    // Suppress events from dependency crates; only this pipeline's
    // targets pass.
    let pipeline_only = FilterFn::new(|metadata| metadata.target().starts_with("courier"));

    let events = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_filter(pipeline_only)
        .with_filter(level_from_env());

    tracing_subscriber::registry().with(events).init();
}
