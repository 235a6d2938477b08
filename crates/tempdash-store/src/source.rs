//! Seam to the hosted document database.
//!
//! The database SDK owns the wire protocol, persistence, and query
//! execution. The dashboard only needs two things from it: a live stream of
//! query results and a one-shot read.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sort direction for an ordered query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A collection query: optional ordering on one top-level field, optional limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored document: id plus untyped body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document's change since the subscriber's previous snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub id: String,
}

/// Result set of a query at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<Document>,
    /// Empty for one-shot fetches
    pub changes: Vec<DocumentChange>,
}

impl QuerySnapshot {
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Document source errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Subscription closed")]
    Closed,
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// Live query results. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Result<QuerySnapshot, SourceError>>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Result<QuerySnapshot, SourceError>>) -> Self {
        Self { rx }
    }

    /// Next snapshot or error; `None` once the source has closed the stream
    pub async fn next(&mut self) -> Option<Result<QuerySnapshot, SourceError>> {
        self.rx.recv().await
    }
}

/// A real-time document database
pub trait DocumentSource: Send + Sync + 'static {
    /// Start listening to a query. The first snapshot delivered is the
    /// current result set with every document reported as added.
    fn subscribe(&self, query: &Query) -> Result<Subscription, SourceError>;

    /// Read a query's current result set once
    fn fetch(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<QuerySnapshot, SourceError>> + Send;
}
