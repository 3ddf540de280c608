//! In-memory document store.
//!
//! Collections of JSON documents keyed by `_id`, with declared references
//! (`collection.field -> target collection`) that `materialize` can resolve.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use url::Url;

use super::{ConnectionEvent, Connector, Document, DocumentQuery, StoreError};

#[derive(Debug, Default)]
struct State {
    collections: IndexMap<String, Vec<Document>>,
    references: HashMap<(String, String), String>,
    next_id: u64,
}

impl State {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    fn find_by_id(&self, collection: &str, id: &Value) -> Option<&Document> {
        self.collections.get(collection)?.iter().find(|d| d.get("_id") == Some(id))
    }

    fn resolve(&self, collection: &str, id: &Value) -> Value {
        match self.find_by_id(collection, id) {
            Some(doc) => Value::Object(doc.clone()),
            None => Value::Null,
        }
    }

    /// Replace each declared reference in `doc` by the referenced document.
    fn populate(&self, collection: &str, mut doc: Document, references: &[String]) -> Document {
        for field in references {
            let Some(target) = self.references.get(&(collection.to_string(), field.clone())) else {
                tracing::trace!(collection, field = %field, "no reference declared, skipping");
                continue;
            };
            let Some(current) = doc.get_mut(field) else { continue };
            let resolved = match &*current {
                Value::Array(ids) => Value::Array(ids.iter().map(|id| self.resolve(target, id)).collect()),
                Value::Null => Value::Null,
                id => self.resolve(target, id),
            };
            *current = resolved;
        }
        doc
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<RwLock<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self { Self::default() }

    /// Declare that `collection.field` holds `_id`s of documents in `target`.
    pub async fn declare_reference(&self, collection: &str, field: &str, target: &str) {
        let mut state = self.state.write().await;
        state.references.insert((collection.to_string(), field.to_string()), target.to_string());
    }

    pub fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection { db: self.clone(), name: name.to_string() }
    }
}

#[async_trait]
impl Connector for MemoryDatabase {
    async fn open(&self, url: &Url) -> Result<mpsc::UnboundedReceiver<ConnectionEvent>, StoreError> {
        if url.scheme() != "memory" && url.scheme() != "mongodb" {
            return Err(StoreError::Connection(format!("unsupported scheme `{}`", url.scheme())));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ConnectionEvent::Connected).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(rx)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCollection {
    db: MemoryDatabase,
    name: String,
}

#[derive(Debug, Clone)]
enum Op {
    Find { filter: Document, single: bool },
    Insert(Document),
}

#[derive(Debug, Clone)]
pub struct MemoryQuery {
    db: MemoryDatabase,
    collection: String,
    op: Op,
    limit: Option<u64>,
    skip: u64,
}

impl MemoryCollection {
    pub fn name(&self) -> &str { &self.name }

    fn query(&self, op: Op) -> MemoryQuery {
        MemoryQuery { db: self.db.clone(), collection: self.name.clone(), op, limit: None, skip: 0 }
    }

    /// Every document whose fields equal those in `filter`.
    pub fn find(&self, filter: Document) -> MemoryQuery {
        self.query(Op::Find { filter, single: false })
    }

    pub fn find_one(&self, filter: Document) -> MemoryQuery {
        self.query(Op::Find { filter, single: true })
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> MemoryQuery {
        let mut filter = Document::new();
        filter.insert("_id".to_string(), id.into());
        self.find_one(filter)
    }

    /// Insert on materialize; the stored document (with `_id`) is the result.
    pub fn insert(&self, doc: Document) -> MemoryQuery {
        self.query(Op::Insert(doc))
    }

    /// Insert right away, returning the stored documents.
    pub async fn insert_many(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut state = self.db.state.write().await;
        let mut stored = Vec::new();
        for mut doc in docs {
            if !doc.contains_key("_id") {
                let id = state.fresh_id();
                doc.insert("_id".to_string(), Value::String(id));
            }
            state.collections.entry(self.name.clone()).or_default().push(doc.clone());
            stored.push(doc);
        }
        stored
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(k, v)| doc.get(k) == Some(v))
}

#[async_trait]
impl DocumentQuery for MemoryQuery {
    fn limit(&mut self, limit: u64) { self.limit = Some(limit); }
    fn skip(&mut self, offset: u64) { self.skip = offset; }

    async fn materialize(self, references: &[String]) -> Result<Value, StoreError> {
        match self.op {
            Op::Insert(doc) => {
                let stored = self.db.collection(&self.collection).insert_many([doc]).await;
                let state = self.db.state.read().await;
                let doc = stored
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::Query("insert produced no document".to_string()))?;
                Ok(Value::Object(state.populate(&self.collection, doc, references)))
            }
            Op::Find { filter, single } => {
                let state = self.db.state.read().await;
                let docs = state.collections.get(&self.collection).map(Vec::as_slice).unwrap_or_default();
                let found = docs
                    .iter()
                    .filter(|d| matches(d, &filter))
                    .skip(self.skip as usize)
                    .take(self.limit.map_or(usize::MAX, |l| l as usize))
                    .map(|d| state.populate(&self.collection, d.clone(), references));
                if single {
                    Ok(found.map(Value::Object).next().unwrap_or(Value::Null))
                } else {
                    Ok(Value::Array(found.map(Value::Object).collect()))
                }
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
