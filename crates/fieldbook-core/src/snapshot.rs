//! In-memory view of the store that reports are computed from.
//!
//! A `Snapshot` holds typed copies of every collection. It never aggregates
//! incrementally: change sets replace or upsert records, and callers rerun
//! the pure report functions over the new state.

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{PioneerApplication, Publisher, ServiceReport, WatchAssignment};
use crate::store::{Document, DocumentStore, APPLICATIONS, PUBLISHERS, REPORTS, WATCH};

/// Field each live collection is ordered by.
pub const SUBSCRIPTION_ORDER: [(&str, &str); 4] = [
    (PUBLISHERS, "Apellidos"),
    (REPORTS, "anioCalendario"),
    (APPLICATIONS, "fecha"),
    (WATCH, "fecha"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub publishers: Vec<Publisher>,
    pub reports: Vec<ServiceReport>,
    pub applications: Vec<PioneerApplication>,
    pub watch: Vec<WatchAssignment>,
}

/// A pushed update for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub collection: String,
    pub documents: Vec<Document>,
    /// `true` replaces the collection, `false` upserts the given documents
    pub full: bool,
}

impl ChangeSet {
    pub fn full(collection: &str, documents: Vec<Document>) -> Self {
        Self {
            collection: collection.to_string(),
            documents,
            full: true,
        }
    }

    pub fn partial(collection: &str, documents: Vec<Document>) -> Self {
        Self {
            collection: collection.to_string(),
            documents,
            full: false,
        }
    }
}

/// Convert documents, skipping (and logging) the ones that do not fit.
fn decode<T: DeserializeOwned>(collection: &str, documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.to_record::<T>() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection, id = %doc.id, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

/// Replace records sharing an id with the incoming ones; append the rest.
fn upsert_by<T>(existing: &mut Vec<T>, incoming: Vec<T>, same: impl Fn(&T, &T) -> bool) {
    for record in incoming {
        match existing.iter_mut().find(|e| same(e, &record)) {
            Some(slot) => *slot = record,
            None => existing.push(record),
        }
    }
}

impl Snapshot {
    /// Read every collection from the store.
    pub async fn load<S: DocumentStore>(store: &S) -> Result<Self, StoreError> {
        let (publishers, reports, applications, watch) = futures::try_join!(
            store.get_collection(PUBLISHERS),
            store.get_collection(REPORTS),
            store.get_collection(APPLICATIONS),
            store.get_collection(WATCH),
        )?;

        let snapshot = Self {
            publishers: decode(PUBLISHERS, &publishers),
            reports: decode(REPORTS, &reports),
            applications: decode(APPLICATIONS, &applications),
            watch: decode(WATCH, &watch),
        };
        info!(
            publishers = snapshot.publishers.len(),
            reports = snapshot.reports.len(),
            applications = snapshot.applications.len(),
            watch = snapshot.watch.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Apply a change set. Unknown collections are ignored.
    pub fn apply(&mut self, change: ChangeSet) {
        let ChangeSet {
            collection,
            documents,
            full,
        } = change;
        debug!(collection = %collection, count = documents.len(), full, "Applying change set");

        match collection.as_str() {
            PUBLISHERS => {
                let incoming = decode::<Publisher>(&collection, &documents);
                if full {
                    self.publishers = incoming;
                } else {
                    upsert_by(&mut self.publishers, incoming, |a, b| a.id == b.id);
                }
            }
            REPORTS => {
                let incoming = decode::<ServiceReport>(&collection, &documents);
                if full {
                    self.reports = incoming;
                } else {
                    // Same document, or the same publisher and month
                    upsert_by(&mut self.reports, incoming, |a, b| {
                        (a.id.is_some() && a.id == b.id) || a.key() == b.key()
                    });
                }
            }
            APPLICATIONS => {
                let incoming = decode::<PioneerApplication>(&collection, &documents);
                if full {
                    self.applications = incoming;
                } else {
                    upsert_by(&mut self.applications, incoming, |a, b| {
                        a.id.is_some() && a.id == b.id
                    });
                }
            }
            WATCH => {
                let incoming = decode::<WatchAssignment>(&collection, &documents);
                if full {
                    self.watch = incoming;
                } else {
                    upsert_by(&mut self.watch, incoming, |a, b| a.id.is_some() && a.id == b.id);
                }
            }
            other => debug!(collection = other, "Ignoring change set for unknown collection"),
        }
    }

    pub fn publisher(&self, id: &str) -> Option<&Publisher> {
        self.publishers.iter().find(|p| p.id == id)
    }

    /// Distinct group names, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .publishers
            .iter()
            .filter_map(|p| p.group_name().map(str::to_string))
            .collect();
        groups.sort_by(|a, b| crate::utils::cmp_ignore_case(a, b));
        groups.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        groups
    }
}

/// Snapshot kept current by live subscriptions on every collection.
pub struct LiveSnapshot {
    snapshot: Snapshot,
    rx: mpsc::UnboundedReceiver<ChangeSet>,
}

impl LiveSnapshot {
    /// Subscribe to all collections. The initial contents arrive as the
    /// first change sets.
    pub async fn follow<S: DocumentStore>(store: &S) -> Result<Self, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();

        for (collection, order_by) in SUBSCRIPTION_ORDER {
            let mut subscription = store.subscribe(collection, order_by).await?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Ok(documents) = subscription.next().await {
                    if tx.send(ChangeSet::full(collection, documents)).is_err() {
                        break;
                    }
                }
                debug!(collection, "Live subscription ended");
            });
        }

        Ok(Self {
            snapshot: Snapshot::default(),
            rx,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Wait for the next change, apply it and return the updated snapshot.
    /// Returns `None` once every subscription has ended.
    pub async fn next(&mut self) -> Option<&Snapshot> {
        let change = self.rx.recv().await?;
        self.snapshot.apply(change);
        Some(&self.snapshot)
    }

    /// Apply every change already queued without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(change) = self.rx.try_recv() {
            self.snapshot.apply(change);
            applied += 1;
        }
        applied
    }
}
