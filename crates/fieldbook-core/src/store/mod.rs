//! Document store seam.
//!
//! The hosted backend is an external collaborator; this module fixes the
//! operations the rest of the crate relies on (collection reads, live
//! subscriptions, add/update/delete and batch upserts) and ships two
//! implementations:
//!
//! - `MemoryStore`: in-process collections, used by tests and as the engine
//!   behind `FileStore`
//! - `FileStore`: one JSON file per collection, for offline use by the CLI

pub mod file;
pub mod memory;

use std::cmp::Ordering;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::StoreError;

pub use file::{CachedData, FileStore};
pub use memory::MemoryStore;

pub const PUBLISHERS: &str = "publicadores";
pub const REPORTS: &str = "informes";
pub const APPLICATIONS: &str = "solicitudes";
pub const WATCH: &str = "guardias";

pub const COLLECTIONS: [&str; 4] = [PUBLISHERS, REPORTS, APPLICATIONS, WATCH];

/// A stored document: its id plus the remaining fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Deserialize into a record type, with the document id filled in.
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Serialize a record into store fields, splitting off its id (if any).
pub fn record_fields<T: Serialize>(record: &T) -> Result<(Option<String>, Map<String, Value>), StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(mut fields) => {
            let id = match fields.remove("id") {
                Some(Value::String(id)) if !id.is_empty() => Some(id),
                _ => None,
            };
            Ok((id, fields))
        }
        other => Err(StoreError::backend(&format!(
            "record did not serialize to an object: {}",
            other
        ))),
    }
}

/// Split an export file into per-collection documents.
///
/// Each known collection may be an array of objects (ids taken from their
/// `id` field, generated when missing) or an object keyed by document id.
/// Unknown keys are ignored.
pub fn documents_from_export(export: Value) -> Result<Vec<(&'static str, Vec<Document>)>, StoreError> {
    let Value::Object(mut root) = export else {
        return Err(StoreError::backend("export file must be a JSON object"));
    };

    let mut collections = Vec::new();
    for collection in COLLECTIONS {
        let docs = match root.remove(collection) {
            None => continue,
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(mut fields) => {
                        let id = match fields.remove("id") {
                            Some(Value::String(id)) if !id.is_empty() => id,
                            _ => memory::new_id(),
                        };
                        Some(Document::new(id, fields))
                    }
                    _ => None,
                })
                .collect(),
            Some(Value::Object(by_id)) => by_id
                .into_iter()
                .filter_map(|(id, item)| match item {
                    Value::Object(mut fields) => {
                        fields.remove("id");
                        Some(Document::new(id, fields))
                    }
                    _ => None,
                })
                .collect(),
            Some(other) => {
                return Err(StoreError::backend(&format!(
                    "collection {} must be an array or object, found {}",
                    collection, other
                )))
            }
        };
        collections.push((collection, docs));
    }
    Ok(collections)
}

/// One entry of a batch write: merged into `id` when present, added otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrite {
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

impl BatchWrite {
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, StoreError> {
        let (id, fields) = record_fields(record)?;
        Ok(Self { id, fields })
    }
}

/// Live query over a collection. Every change pushes the full collection,
/// ordered by the field given at subscription time.
#[derive(Debug)]
pub struct Subscription {
    pub collection: String,
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    pub(crate) fn new(collection: &str, rx: mpsc::UnboundedReceiver<Vec<Document>>) -> Self {
        Self {
            collection: collection.to_string(),
            rx,
        }
    }

    /// Wait for the next snapshot. Errors once the store is gone.
    pub async fn next(&mut self) -> Result<Vec<Document>, StoreError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| StoreError::Closed(self.collection.clone()))
    }

    /// Latest queued snapshot without waiting, skipping older ones.
    pub fn latest(&mut self) -> Option<Vec<Document>> {
        let mut latest = None;
        while let Ok(docs) = self.rx.try_recv() {
            latest = Some(docs);
        }
        latest
    }
}

/// Operations consumed from the document store.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn get_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to changes; the current contents are pushed immediately.
    async fn subscribe(&self, collection: &str, order_by: &str) -> Result<Subscription, StoreError>;

    /// Add a document and return its new id.
    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Write many records as one logical update. Returns the ids written, in
    /// input order. No partial rollback is promised on failure.
    async fn batch_upsert(&self, collection: &str, writes: Vec<BatchWrite>) -> Result<Vec<String>, StoreError>;
}

/// Order documents by a field: numbers numerically, then strings, then
/// everything else; missing fields sort last. Ties fall back to the id.
pub(crate) fn order_documents(docs: &mut [Document], order_by: &str) {
    docs.sort_by(|a, b| {
        compare_values(a.fields.get(order_by), b.fields.get(order_by)).then_with(|| a.id.cmp(&b.id))
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Number(_)) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Null) | None => 3,
            Some(_) => 2,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
