//! Database connection with lifecycle logging.

use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use crate::config::ConfigError;
use crate::store::{ConnectionEvent, Connector, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub logging: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self { Self { logging: true } }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Event(String),
    #[error("connection closed before it was established")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub database: String,
}

/// Last path segment of the url, without the query string.
pub fn database_name(url: &Url) -> String {
    url.path_segments().and_then(|mut s| s.next_back()).unwrap_or_default().to_string()
}

pub fn parse_database_url(raw: &str) -> Result<Url, ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::MissingDatabaseUrl);
    }
    Url::parse(raw).map_err(|source| ConfigError::InvalidDatabaseUrl { url: raw.to_string(), source })
}

fn log_event(event: &ConnectionEvent, logging: bool) {
    if !logging {
        return;
    }
    match event {
        ConnectionEvent::Connected => tracing::info!("Connection Established"),
        ConnectionEvent::Reconnected => tracing::info!("Connection Reestablished"),
        ConnectionEvent::Disconnected => tracing::info!("Connection Disconnected"),
        ConnectionEvent::Closed => tracing::info!("Connection Closed"),
        ConnectionEvent::Error(e) => tracing::error!("ERROR: {e}"),
    }
}

/// Open `url` and wait for the first `Connected` (or `Error`) event.
///
/// Later events keep being logged from a background task.
pub async fn connect<C: Connector + ?Sized>(
    connector: &C,
    url: &str,
    options: ConnectOptions,
) -> Result<Connected, ConnectError> {
    let url = parse_database_url(url)?;
    let database = database_name(&url);
    if options.logging {
        tracing::info!("Connecting to database: {database}");
    }

    let mut events = connector.open(&url).await?;
    loop {
        let Some(event) = events.recv().await else { return Err(ConnectError::Closed) };
        log_event(&event, options.logging);
        match event {
            ConnectionEvent::Connected => break,
            ConnectionEvent::Error(e) => return Err(ConnectError::Event(e)),
            _ => {}
        }
    }

    tokio::spawn(watch(events, options.logging));
    Ok(Connected { database })
}

async fn watch(mut events: UnboundedReceiver<ConnectionEvent>, logging: bool) {
    while let Some(event) = events.recv().await {
        log_event(&event, logging);
    }
}
