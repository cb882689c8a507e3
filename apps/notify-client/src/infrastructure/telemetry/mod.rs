//! Tracing Setup
//!
//! Configures structured logging via `tracing-subscriber` with an
//! environment-driven filter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard filter directives (default: `notify_client=info`)
//!
//! # Usage
//!
//! ```ignore
//! use notify_client::infrastructure::telemetry;
//!
//! telemetry::init();
//! tracing::info!("starting up");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Call once at startup; a second call is ignored so tests can initialize
/// freely.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        "notify_client=info"
            .parse()
            .expect("static directive 'notify_client=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
