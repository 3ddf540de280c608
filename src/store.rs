//! Data-layer seams: document queries and connection events.
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use url::Url;

pub use memory::{MemoryCollection, MemoryDatabase, MemoryQuery};

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// A pending read or write against a collection.
///
/// `materialize` is the single way to run it: reads and writes alike come
/// back as plain JSON (an object, an array of objects, or null) with every
/// listed reference field replaced by the document it points at.
#[async_trait]
pub trait DocumentQuery: Send + Sized {
    fn limit(&mut self, limit: u64);
    fn skip(&mut self, offset: u64);
    async fn materialize(self, references: &[String]) -> Result<Value, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Reconnected,
    Disconnected,
    Closed,
    Error(String),
}

/// Opens a database connection and reports its lifecycle as events.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &Url) -> Result<mpsc::UnboundedReceiver<ConnectionEvent>, StoreError>;
}
