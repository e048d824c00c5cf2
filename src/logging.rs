//! Tracing subscriber setup.
//!
//! gantry itself only emits `tracing` events. Applications call [`init`]
//! once at startup to print them; libraries embedding gantry may install
//! their own subscriber instead.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber filtered by `directive`
/// (`EnvFilter` syntax). An unparsable directive falls back to `info`.
/// Does nothing if a global subscriber is already set.
pub fn init(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter `{directive}` ({e}), using `info`");
        EnvFilter::new("info")
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
