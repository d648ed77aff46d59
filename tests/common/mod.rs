//! Shared test infrastructure: an in-memory stand-in for the backing
//! platform plus a fixed-identity auth provider.
//!
//! `MemoryStore` enforces configured unique keys with a tagged
//! `ConstraintViolation`, assigns sequential ids and creation stamps, and
//! keeps `batch_insert` all-or-nothing, which is everything the engines
//! assume about the real platform.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use ledgerkit::store::{AuthProvider, DataStore, Fields, Identity, Record, StoreError};

/// Route engine logs through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const TEST_USER_ID: &str = "user-1";
pub const TEST_USER_EMAIL: &str = "admin@example.com";

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Record>>,
    unique_keys: HashMap<String, String>,
    failing_fetches: HashSet<String>,
    next_id: u64,
    batch_calls: usize,
}

impl Inner {
    fn insert_record(&mut self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        if let Some(key) = self.unique_keys.get(collection) {
            if let Some(value) = payload.get(key).filter(|v| !v.is_null()) {
                let clash = self
                    .collections
                    .get(collection)
                    .is_some_and(|records| records.iter().any(|r| r.get(key) == Some(value)));
                if clash {
                    return Err(StoreError::ConstraintViolation {
                        field: Some(key.clone()),
                        message: format!("duplicate value {value} in {collection}.{key}"),
                    });
                }
            }
        }

        self.next_id += 1;
        let record = Record {
            id: Some(format!("rec-{}", self.next_id)),
            created_at: Some(format!("2026-01-01T00:00:00.{:06}Z", self.next_id)),
            updated_at: None,
            fields: payload,
        };
        self.collections.entry(collection.to_string()).or_default().push(record.clone());
        Ok(record)
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { inner: Mutex::new(Inner::default()) }
    }

    /// A store with the natural unique keys the restore schema expects.
    pub fn with_default_keys() -> Self {
        let store = MemoryStore::new();
        for (collection, key) in [
            ("accounts", "code"),
            ("product_categories", "name"),
            ("vendors", "email"),
            ("customers", "email"),
            ("employees", "employee_number"),
            ("products", "sku"),
            ("sales_orders", "order_number"),
            ("purchase_orders", "order_number"),
        ] {
            store.set_unique_key(collection, key);
        }
        store
    }

    pub fn set_unique_key(&self, collection: &str, field: &str) {
        self.inner
            .lock()
            .unwrap()
            .unique_keys
            .insert(collection.to_string(), field.to_string());
    }

    /// Make fetch_all of one collection fail with a query error.
    pub fn fail_fetch_of(&self, collection: &str) {
        self.inner.lock().unwrap().failing_fetches.insert(collection.to_string());
    }

    /// Insert fixture data directly, going through the same unique-key and
    /// id-assignment path as the trait methods.
    pub fn seed(&self, collection: &str, payload: Fields) -> Record {
        self.inner
            .lock()
            .unwrap()
            .insert_record(collection, payload)
            .expect("seeding clashed with a unique key")
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.inner.lock().unwrap().collections.get(collection).cloned().unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.records(collection).len()
    }

    pub fn batch_calls(&self) -> usize {
        self.inner.lock().unwrap().batch_calls
    }
}

impl DataStore for MemoryStore {
    async fn fetch_all(&self, collection: &str, order_by: &str) -> Result<Vec<Record>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_fetches.contains(collection) {
            return Err(StoreError::Query(format!("simulated fetch failure for {collection}")));
        }
        let mut records = inner.collections.get(collection).cloned().unwrap_or_default();
        records.sort_by(|a, b| {
            let key = |r: &Record| match order_by {
                "created_at" => r.created_at.clone().unwrap_or_default(),
                field => r.get_str(field).unwrap_or_default().to_string(),
            };
            key(a).cmp(&key(b))
        });
        Ok(records)
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.get(field) == Some(value)))
            .cloned())
    }

    async fn insert(&self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        self.inner.lock().unwrap().insert_record(collection, payload)
    }

    async fn update(&self, collection: &str, id: &str, payload: Fields) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id.as_deref() == Some(id)))
            .ok_or(StoreError::NotFound)?;
        for (field, value) in payload {
            record.fields.insert(field, value);
        }
        record.updated_at = Some("2026-01-02T00:00:00Z".to_string());
        Ok(())
    }

    async fn batch_insert(
        &self,
        collection: &str,
        payloads: Vec<Fields>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batch_calls += 1;

        // all-or-nothing: validate the whole batch before touching anything
        if let Some(key) = inner.unique_keys.get(collection).cloned() {
            let mut seen = Vec::new();
            for payload in &payloads {
                if let Some(value) = payload.get(&key).filter(|v| !v.is_null()) {
                    let clash = seen.contains(&value)
                        || inner.collections.get(collection).is_some_and(|records| {
                            records.iter().any(|r| r.get(&key) == Some(value))
                        });
                    if clash {
                        return Err(StoreError::ConstraintViolation {
                            field: Some(key.clone()),
                            message: format!("duplicate value {value} in {collection}.{key}"),
                        });
                    }
                    seen.push(value);
                }
            }
        }

        let mut created = Vec::with_capacity(payloads.len());
        for payload in payloads {
            created.push(inner.insert_record(collection, payload)?);
        }
        Ok(created)
    }
}

pub struct TestAuth(pub Option<Identity>);

impl AuthProvider for TestAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

pub fn signed_in() -> TestAuth {
    TestAuth(Some(Identity { id: TEST_USER_ID.to_string(), email: TEST_USER_EMAIL.to_string() }))
}

pub fn signed_out() -> TestAuth {
    TestAuth(None)
}

/// Shorthand for building an open payload from field/value pairs.
pub fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
