//! In-process [`DocumentSource`] backed by a map of collections.
//!
//! Used for local runs against a JSON fixture and for tests. Query semantics
//! follow the hosted database: ordering excludes documents missing the
//! ordered field, ties break on document id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::source::{
    ChangeKind, Direction, Document, DocumentChange, DocumentSource, Query, QuerySnapshot,
    SourceError, Subscription,
};

struct Subscriber {
    query: Query,
    last: Vec<Document>,
    tx: mpsc::UnboundedSender<Result<QuerySnapshot, SourceError>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    subscribers: Vec<Subscriber>,
    unavailable: Option<String>,
}

/// Shared handle; clones see the same data.
#[derive(Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemorySource")
            .field("collections", &inner.collections.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        // Numbers sort before strings, as in the hosted database.
        (Value::Number(_), Value::String(_)) => Ordering::Less,
        (Value::String(_), Value::Number(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn run_query(collection: Option<&BTreeMap<String, Value>>, query: &Query) -> Vec<Document> {
    let Some(collection) = collection else {
        return Vec::new();
    };

    let mut docs: Vec<Document> = collection
        .iter()
        .map(|(id, data)| Document {
            id: id.clone(),
            data: data.clone(),
        })
        .collect();

    if let Some((field, direction)) = &query.order_by {
        docs.retain(|d| d.data.get(field).is_some_and(|v| !v.is_null()));
        docs.sort_by(|a, b| {
            let ord = compare_values(&a.data[field.as_str()], &b.data[field.as_str()])
                .then_with(|| a.id.cmp(&b.id));
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }

    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }
    docs
}

fn diff(previous: &[Document], current: &[Document]) -> Vec<DocumentChange> {
    let mut changes = Vec::new();
    for doc in current {
        match previous.iter().find(|p| p.id == doc.id) {
            None => changes.push(DocumentChange {
                kind: ChangeKind::Added,
                id: doc.id.clone(),
            }),
            Some(p) if p.data != doc.data => changes.push(DocumentChange {
                kind: ChangeKind::Modified,
                id: doc.id.clone(),
            }),
            Some(_) => {}
        }
    }
    for doc in previous {
        if !current.iter().any(|c| c.id == doc.id) {
            changes.push(DocumentChange {
                kind: ChangeKind::Removed,
                id: doc.id.clone(),
            });
        }
    }
    changes
}

impl Inner {
    fn check_available(&self) -> Result<(), SourceError> {
        match &self.unavailable {
            Some(reason) => Err(SourceError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Push fresh results to every subscriber of `collection` whose result set changed
    fn notify(&mut self, collection: &str) {
        let Inner {
            collections,
            subscribers,
            ..
        } = self;

        subscribers.retain_mut(|sub| {
            if sub.query.collection != collection {
                return !sub.tx.is_closed();
            }
            let docs = run_query(collections.get(collection), &sub.query);
            let changes = diff(&sub.last, &docs);
            if changes.is_empty() {
                return !sub.tx.is_closed();
            }
            sub.last = docs.clone();
            sub.tx.send(Ok(QuerySnapshot { docs, changes })).is_ok()
        });
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn put(&self, collection: &str, id: &str, data: Value) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        inner.notify(collection);
    }

    /// Delete a document; returns whether it existed
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let existed = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();
        if existed {
            inner.notify(collection);
        }
        existed
    }

    /// Load `{ "<collection>": { "<id>": { ...document... } } }` from a JSON file.
    ///
    /// Returns the number of documents loaded.
    pub fn load_fixture(&self, path: &Path) -> Result<usize, SourceError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("{}: {}", path.display(), e)))?;
        let fixture: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&contents)
            .map_err(|e| SourceError::Fixture(format!("{}: {}", path.display(), e)))?;

        let mut count = 0;
        for (collection, docs) in fixture {
            for (id, data) in docs {
                self.put(&collection, &id, data);
                count += 1;
            }
        }
        tracing::info!("Loaded {} documents from {}", count, path.display());
        Ok(count)
    }

    /// Make subscribe and fetch fail until cleared with `None`
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.inner.lock().unavailable = reason.map(str::to_string);
    }

    /// Deliver an error to every live subscriber of `collection`
    pub fn fail_subscribers(&self, collection: &str, error: SourceError) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|sub| {
            if sub.query.collection != collection {
                return true;
            }
            sub.tx.send(Err(error.clone())).is_ok()
        });
    }

    /// Close every subscription, as the hosted SDK does on sign-out
    pub fn close_all(&self) {
        self.inner.lock().subscribers.clear();
    }

    fn read(&self, query: &Query) -> Result<QuerySnapshot, SourceError> {
        if query.collection.is_empty() {
            return Err(SourceError::InvalidQuery("empty collection name".to_string()));
        }

        let inner = self.inner.lock();
        inner.check_available()?;
        Ok(QuerySnapshot {
            docs: run_query(inner.collections.get(&query.collection), query),
            changes: Vec::new(),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|s| !s.tx.is_closed());
        inner.subscribers.len()
    }
}

impl DocumentSource for MemorySource {
    fn subscribe(&self, query: &Query) -> Result<Subscription, SourceError> {
        if query.collection.is_empty() {
            return Err(SourceError::InvalidQuery("empty collection name".to_string()));
        }

        let mut inner = self.inner.lock();
        inner.check_available()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let docs = run_query(inner.collections.get(&query.collection), query);
        let changes = docs
            .iter()
            .map(|d| DocumentChange {
                kind: ChangeKind::Added,
                id: d.id.clone(),
            })
            .collect();

        // Receiver is alive in this scope; send cannot fail.
        let _ = tx.send(Ok(QuerySnapshot {
            docs: docs.clone(),
            changes,
        }));

        tracing::debug!("New subscriber on {}", query.collection);
        inner.subscribers.push(Subscriber {
            query: query.clone(),
            last: docs,
            tx,
        });
        Ok(Subscription::new(rx))
    }

    fn fetch(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<QuerySnapshot, SourceError>> + Send {
        std::future::ready(self.read(query))
    }
}
