//! Logging setup and the "never crash" process handlers.

use std::fmt::Display;
use std::future::Future;

use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigError;

/// Install the global fmt subscriber. `RUST_LOG`, when set, overrides `filter`.
pub fn init(filter: &str) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|_| ConfigError::LogFilter(filter.to_string()))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ConfigError::LogFilter(e.to_string()))
}

/// Log panics through tracing instead of the default stderr report.
pub fn catch_app_errors() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| l.to_string()).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::error!(%location, %payload, "Problem: uncaughtException");
    }));
}

/// Spawn `fut`; an `Err` outcome is logged and dropped.
pub fn spawn_logged<F, E>(fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(reason) = fut.await {
            tracing::error!(%reason, "Problem: Unhandled Rejection");
        }
    })
}
