//! Notify Client Binary
//!
//! Connects to the document notification service and logs every event the
//! server pushes until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin notify-client
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `NOTIFY_API_BASE_URL`: Service base URL (default: <http://localhost:8080>)
//! - `NOTIFY_RECONNECT_INTERVAL_MS`: Delay between reconnect attempts (default: 3000)
//! - `NOTIFY_MAX_RECONNECT_ATTEMPTS`: Reconnect budget, 0 for unlimited (default: 5)
//! - `NOTIFY_DELIVERY_MODE`: "immediate" | "throttled" (default: immediate)
//! - `NOTIFY_THROTTLE_WINDOW_MS`: Throttled buffering window (default: 5000)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use notify_client::infrastructure::telemetry;
use notify_client::{ClientConfig, NotificationService};
use tokio::signal;

/// Interval between connection status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting notify client");

    let config = ClientConfig::from_env()?;
    log_config(&config);

    let service = Arc::new(NotificationService::new(config)?);

    let received = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&received);
    let _subscription = service.subscribe_notifications(move |event| {
        let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            id = %event.id,
            user = %event.actor.name,
            document = %event.subject.title,
            timestamp = %event.timestamp,
            total,
            "notification received"
        );
    });

    service.connect();

    // Periodic status line so a silent channel is distinguishable from a
    // dead one.
    let status_service = Arc::clone(&service);
    let status_received = Arc::clone(&received);
    let status_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATUS_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tracing::debug!(
                state = status_service.state().as_str(),
                received = status_received.load(Ordering::Relaxed),
                "connection status"
            );
        }
    });

    await_shutdown().await;

    status_task.abort();
    service.disconnect();

    tracing::info!("Notify client stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        url = %config.notifications_url(),
        reconnect_interval_ms = config.connection.reconnect_interval.as_millis() as u64,
        max_reconnect_attempts = config.connection.max_reconnect_attempts,
        delivery_mode = config.dispatch.mode.as_str(),
        "Configuration loaded"
    );
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
