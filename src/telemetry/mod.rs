//! Tracing bootstrap.
//!
//! The library only emits `tracing` events and spans; it never installs a
//! subscriber on its own. Binaries, demos, and tests that want formatted
//! output call [`init`] once at startup. `RUST_LOG` always wins over the
//! built-in directives.

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info,stratoflow=info";

/// Installs the default subscriber: env-filtered fmt output plus an
/// [`ErrorLayer`] so diagnostics can capture span traces.
///
/// Calling this more than once is harmless; later calls leave the existing
/// subscriber in place.
pub fn init() {
    init_with_directives(DEFAULT_DIRECTIVES);
}

/// Like [`init`] with explicit fallback directives.
pub fn init_with_directives(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_default();

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        // Log span open/close so the instrumented run phases show up.
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }
}
