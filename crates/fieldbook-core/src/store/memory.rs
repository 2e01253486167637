use std::collections::{BTreeMap, HashMap};

use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::{order_documents, BatchWrite, Document, DocumentStore, Subscription};
use crate::error::StoreError;

/// Length of generated document ids
const ID_LENGTH: usize = 20;

struct Subscriber {
    order_by: String,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

type Collection = BTreeMap<String, Map<String, Value>>;

fn to_documents(docs: &Collection) -> Vec<Document> {
    docs.iter()
        .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
        .collect()
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

/// Write-through hook run on the staged collection before it is committed.
/// An error discards the change.
pub(crate) trait Persist {
    fn persist(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError>;
}

/// Nothing to write for a purely in-memory store
struct NoPersist;

impl Persist for NoPersist {
    fn persist(&self, _: &str, _: Vec<Document>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl State {
    fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(to_documents)
            .unwrap_or_default()
    }

    /// Push the collection to its live subscribers, dropping closed ones.
    fn notify(&mut self, collection: &str) {
        let docs = self.documents(collection);
        if let Some(subscribers) = self.subscribers.get_mut(collection) {
            subscribers.retain(|sub| {
                let mut ordered = docs.clone();
                order_documents(&mut ordered, &sub.order_by);
                sub.tx.send(ordered).is_ok()
            });
            debug!(collection, subscribers = subscribers.len(), "Notified subscribers");
        }
    }
}

/// In-process document store.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

pub(crate) fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `change` to a copy of the collection, persist the copy, then
    /// commit it and notify subscribers. Any error leaves the store as it was.
    async fn mutate<R>(
        &self,
        collection: &str,
        persist: &impl Persist,
        change: impl FnOnce(&mut Collection) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut state = self.state.write().await;
        let mut staged = state.collections.get(collection).cloned().unwrap_or_default();
        let result = change(&mut staged)?;
        persist.persist(collection, to_documents(&staged))?;
        state.collections.insert(collection.to_string(), staged);
        state.notify(collection);
        Ok(result)
    }

    /// Replace a whole collection, e.g. when importing an export file.
    pub async fn replace_collection(&self, collection: &str, docs: Vec<Document>) {
        // Cannot fail without a persistence hook
        let _ = self.replace_collection_with(collection, docs, &NoPersist).await;
    }

    pub(crate) async fn replace_collection_with(
        &self,
        collection: &str,
        docs: Vec<Document>,
        persist: &impl Persist,
    ) -> Result<(), StoreError> {
        let entries: Collection = docs.into_iter().map(|d| (d.id, d.fields)).collect();
        self.mutate(collection, persist, |staged| {
            *staged = entries;
            Ok(())
        })
        .await
    }

    pub(crate) async fn add_with(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        persist: &impl Persist,
    ) -> Result<String, StoreError> {
        let id = new_id();
        self.mutate(collection, persist, |staged| {
            staged.insert(id.clone(), fields);
            Ok(())
        })
        .await?;
        debug!(collection, id = %id, "Document added");
        Ok(id)
    }

    pub(crate) async fn update_with(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        persist: &impl Persist,
    ) -> Result<(), StoreError> {
        self.mutate(collection, persist, |staged| {
            staged
                .get_mut(id)
                .ok_or_else(|| not_found(collection, id))?
                .extend(fields);
            Ok(())
        })
        .await?;
        debug!(collection, id, "Document updated");
        Ok(())
    }

    pub(crate) async fn delete_with(&self, collection: &str, id: &str, persist: &impl Persist) -> Result<(), StoreError> {
        self.mutate(collection, persist, |staged| {
            staged.remove(id).map(|_| ()).ok_or_else(|| not_found(collection, id))
        })
        .await?;
        debug!(collection, id, "Document deleted");
        Ok(())
    }

    pub(crate) async fn batch_upsert_with(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
        persist: &impl Persist,
    ) -> Result<Vec<String>, StoreError> {
        let ids = self
            .mutate(collection, persist, |staged| {
                let mut ids = Vec::with_capacity(writes.len());
                for write in writes {
                    let id = write.id.unwrap_or_else(new_id);
                    staged.entry(id.clone()).or_default().extend(write.fields);
                    ids.push(id);
                }
                Ok(ids)
            })
            .await?;
        debug!(collection, count = ids.len(), "Batch upsert applied");
        Ok(ids)
    }

    pub async fn len(&self, collection: &str) -> usize {
        let state = self.state.read().await;
        state.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

impl DocumentStore for MemoryStore {
    async fn get_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.state.read().await.documents(collection))
    }

    async fn subscribe(&self, collection: &str, order_by: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;

        let mut initial = state.documents(collection);
        order_documents(&mut initial, order_by);
        // The receiver is still in hand, so this cannot fail
        let _ = tx.send(initial);

        state
            .subscribers
            .entry(collection.to_string())
            .or_default()
            .push(Subscriber {
                order_by: order_by.to_string(),
                tx,
            });
        debug!(collection, order_by, "Subscription opened");
        Ok(Subscription::new(collection, rx))
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        self.add_with(collection, fields, &NoPersist).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.update_with(collection, id, fields, &NoPersist).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.delete_with(collection, id, &NoPersist).await
    }

    async fn batch_upsert(&self, collection: &str, writes: Vec<BatchWrite>) -> Result<Vec<String>, StoreError> {
        self.batch_upsert_with(collection, writes, &NoPersist).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let store = MemoryStore::new();
        let id = store
            .add("publicadores", fields(json!({"Nombre": "Ana", "Grupo": "Norte"})))
            .await
            .unwrap();
        assert_eq!(id.len(), ID_LENGTH);

        store
            .update("publicadores", &id, fields(json!({"Grupo": "Sur"})))
            .await
            .unwrap();
        let docs = store.get_collection("publicadores").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].field_str("Grupo"), Some("Sur"));
        assert_eq!(docs[0].field_str("Nombre"), Some("Ana"));

        store.delete("publicadores", &id).await.unwrap();
        assert!(store.is_empty("publicadores").await);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("informes", "nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        let err = store.delete("informes", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscription_receives_initial_and_ordered_updates() {
        let store = MemoryStore::new();
        store
            .add("publicadores", fields(json!({"Apellidos": "Ruiz"})))
            .await
            .unwrap();

        let mut sub = store.subscribe("publicadores", "Apellidos").await.unwrap();
        let initial = sub.next().await.unwrap();
        assert_eq!(initial.len(), 1);

        store
            .add("publicadores", fields(json!({"Apellidos": "Díaz"})))
            .await
            .unwrap();
        let update = sub.next().await.unwrap();
        assert_eq!(update.len(), 2);
        assert_eq!(update[0].field_str("Apellidos"), Some("Díaz"));
        assert_eq!(update[1].field_str("Apellidos"), Some("Ruiz"));
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_pruned() {
        let store = MemoryStore::new();
        let sub = store.subscribe("informes", "mes").await.unwrap();
        drop(sub);
        store.add("informes", Map::new()).await.unwrap();
        assert!(store.state.read().await.subscribers["informes"].is_empty());
    }

    #[tokio::test]
    async fn test_batch_upsert_merges_and_adds() {
        let store = MemoryStore::new();
        let id = store
            .add("informes", fields(json!({"horas": 10, "notas": "x"})))
            .await
            .unwrap();

        let ids = store
            .batch_upsert(
                "informes",
                vec![
                    BatchWrite {
                        id: Some(id.clone()),
                        fields: fields(json!({"horas": 12})),
                    },
                    BatchWrite {
                        id: None,
                        fields: fields(json!({"horas": 3})),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], id);

        let docs = store.get_collection("informes").await.unwrap();
        assert_eq!(docs.len(), 2);
        let merged = docs.iter().find(|d| d.id == id).unwrap();
        assert_eq!(merged.fields["horas"], json!(12));
        assert_eq!(merged.field_str("notas"), Some("x"));
    }

    struct RejectWrites;

    impl Persist for RejectWrites {
        fn persist(&self, _: &str, _: Vec<Document>) -> Result<(), StoreError> {
            Err(StoreError::backend("disk full"))
        }
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let store = MemoryStore::new();
        let id = store.add("informes", fields(json!({"horas": 1}))).await.unwrap();
        let mut sub = store.subscribe("informes", "horas").await.unwrap();
        sub.latest().unwrap();

        let err = store
            .add_with("informes", fields(json!({"horas": 2})), &RejectWrites)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        store
            .update_with("informes", &id, fields(json!({"horas": 5})), &RejectWrites)
            .await
            .unwrap_err();
        store.delete_with("informes", &id, &RejectWrites).await.unwrap_err();

        let docs = store.get_collection("informes").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["horas"], json!(1));
        // Subscribers never hear about rejected writes
        assert!(sub.latest().is_none());
    }

    #[tokio::test]
    async fn test_latest_skips_stale_snapshots() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("guardias", "fecha").await.unwrap();
        store.add("guardias", Map::new()).await.unwrap();
        store.add("guardias", Map::new()).await.unwrap();
        let latest = sub.latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert!(sub.latest().is_none());
    }
}
