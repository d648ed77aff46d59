//! Collaborator interfaces for the backing platform.
//!
//! The application runs against an external service that owns persistence,
//! query planning and row-level authorization. This module defines the two
//! seams the engines talk through: `DataStore` for record CRUD and
//! `AuthProvider` for the current identity. Nothing in this crate implements
//! them against a real backend; the embedding application does.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open payload shape sent to the store: field name to JSON value.
pub type Fields = Map<String, Value>;

/// A record as the platform returns it: platform-assigned `id` and
/// timestamps, with every domain field in an open map so fields this crate
/// does not model survive an export/restore round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Failure kinds the platform client reports. Tagged variants, so callers
/// never have to pattern-match prose: the restore engine branches on
/// `ConstraintViolation` specifically.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Connectivity(String),
    Query(String),
    ConstraintViolation { field: Option<String>, message: String },
    Validation(String),
    NotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connectivity(msg) => write!(f, "connectivity error: {msg}"),
            StoreError::Query(msg) => write!(f, "query error: {msg}"),
            StoreError::ConstraintViolation { field: Some(field), message } => {
                write!(f, "constraint violation on '{field}': {message}")
            }
            StoreError::ConstraintViolation { field: None, message } => {
                write!(f, "constraint violation: {message}")
            }
            StoreError::Validation(msg) => write!(f, "validation error: {msg}"),
            StoreError::NotFound => write!(f, "record not found"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Record CRUD against one named collection.
///
/// `batch_insert` is all-or-nothing per call on the platform side; the import
/// engine relies on that and never re-implements it.
#[allow(async_fn_in_trait)]
pub trait DataStore {
    /// Fetch every record of a collection, ordered ascending by `order_by`.
    async fn fetch_all(&self, collection: &str, order_by: &str) -> Result<Vec<Record>, StoreError>;

    /// Find at most one record where `field` equals `value`.
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError>;

    /// Insert one record; the returned record carries the generated id.
    async fn insert(&self, collection: &str, payload: Fields) -> Result<Record, StoreError>;

    /// Partial update of the record with the given id.
    async fn update(&self, collection: &str, id: &str, payload: Fields) -> Result<(), StoreError>;

    /// Insert a batch atomically; returns the created records in input order.
    async fn batch_insert(
        &self,
        collection: &str,
        payloads: Vec<Fields>,
    ) -> Result<Vec<Record>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Current-identity lookup. Both engines require `Some` before touching the
/// store; `None` is a user-facing precondition failure, not an internal error.
pub trait AuthProvider {
    fn current_identity(&self) -> Option<Identity>;
}
