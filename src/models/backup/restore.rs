//! Snapshot restore.
//!
//! Best-effort, record-level partial failure: there is no server-side
//! multi-table transaction to lean on, so every record is an independent
//! unit of work. A rejected record is counted and reported, never rolled
//! back, and never stops its siblings. Only structural and precondition
//! problems abort the whole run.
//!
//! Records are written strictly in snapshot order, collection by collection
//! in the fixed dependency order, because a later record may reference an id
//! minted by an earlier write in the same run.

use serde_json::Value;

use crate::errors::BackupError;
use crate::store::{AuthProvider, DataStore, Fields, Record, StoreError};

use super::schema::{COLLECTIONS, CollectionSpec};
use super::types::{CollectionOutcome, IdMap, RestoreReport, Snapshot};

/// Restore a snapshot into the store. The caller has already shown the
/// snapshot summary and obtained the user's confirmation; declining simply
/// means this function is never called.
pub async fn restore_snapshot<S, A>(
    store: &S,
    auth: &A,
    snapshot: &Snapshot,
) -> Result<RestoreReport, BackupError>
where
    S: DataStore,
    A: AuthProvider,
{
    auth.current_identity().ok_or(BackupError::NotAuthenticated)?;

    let mut id_map = IdMap::new();
    let mut report = RestoreReport::default();

    for spec in COLLECTIONS {
        let Some(records) = snapshot.data.get(spec.name) else {
            continue;
        };
        if records.is_empty() {
            continue;
        }
        let outcome = restore_collection(store, spec, records, &mut id_map).await;
        log::info!(
            "restore {}: {} restored, {} failed",
            spec.name,
            outcome.restored,
            outcome.failed
        );
        report.collections.push(outcome);
    }

    log::info!(
        "restore finished: {} restored, {} failed, {} ids remapped",
        report.total_restored(),
        report.total_failed(),
        id_map.len()
    );
    Ok(report)
}

async fn restore_collection<S: DataStore>(
    store: &S,
    spec: &CollectionSpec,
    records: &[Record],
    id_map: &mut IdMap,
) -> CollectionOutcome {
    let mut outcome = CollectionOutcome {
        collection: spec.name.to_string(),
        ..CollectionOutcome::default()
    };

    for record in records {
        match restore_record(store, spec, record, id_map).await {
            Ok(Some(new_id)) => {
                outcome.restored += 1;
                if let Some(old_id) = &record.id {
                    id_map.record(spec.name, old_id, &new_id);
                }
            }
            // nothing left to write after stripping; not an error
            Ok(None) => {}
            Err(message) => {
                log::warn!("restore {}: {message}", spec.name);
                outcome.failed += 1;
                outcome.errors.push(message);
            }
        }
    }

    outcome
}

/// Process one record: strip, remap, then write. `Ok(Some(id))` on a
/// successful insert or update, `Ok(None)` when the payload emptied out,
/// `Err` with the reason when the record is rejected.
async fn restore_record<S: DataStore>(
    store: &S,
    spec: &CollectionSpec,
    record: &Record,
    id_map: &IdMap,
) -> Result<Option<String>, String> {
    // id/created_at/updated_at live outside `fields`, so cloning the open
    // map already drops them; new values are platform-assigned.
    let mut payload: Fields = record.fields.clone();
    for field in spec.stripped {
        payload.remove(*field);
    }

    for remap in spec.optional_remap {
        let old_id = match payload.get(remap.field) {
            Some(Value::String(s)) => s.clone(),
            // absent or already null: leave as-is
            _ => continue,
        };
        let rewritten = match id_map.resolve(remap.references, &old_id) {
            Some(new_id) => Value::String(new_id.to_string()),
            None => Value::Null,
        };
        payload.insert(remap.field.to_string(), rewritten);
    }

    for remap in spec.required_remap {
        let resolved = payload
            .get(remap.field)
            .and_then(Value::as_str)
            .and_then(|old_id| id_map.resolve(remap.references, old_id))
            .map(str::to_string);
        match resolved {
            Some(new_id) => {
                payload.insert(remap.field.to_string(), Value::String(new_id));
            }
            None => {
                return Err(format!(
                    "unresolved required reference {}{}",
                    remap.field,
                    record
                        .id
                        .as_deref()
                        .map(|id| format!(" (record {id})"))
                        .unwrap_or_default()
                ));
            }
        }
    }

    if payload.is_empty() {
        return Ok(None);
    }

    let natural_key = spec.unique_key.and_then(|key| {
        payload
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
            .map(|value| (key, value))
    });

    let new_id = match natural_key {
        Some((key, value)) => upsert_by_key(store, spec.name, key, &value, payload).await?,
        None => {
            let created = store
                .insert(spec.name, payload)
                .await
                .map_err(|e| format!("insert failed: {e}"))?;
            created.id.ok_or_else(|| "store returned a record without id".to_string())?
        }
    };

    Ok(Some(new_id))
}

/// Insert-vs-update by natural key. Find first; on insert losing to a
/// concurrent writer (a tagged constraint violation), retry once as
/// find-then-update. Any other store error is terminal for this record.
async fn upsert_by_key<S: DataStore>(
    store: &S,
    collection: &str,
    key: &str,
    value: &Value,
    payload: Fields,
) -> Result<String, String> {
    let existing = store
        .find_one(collection, key, value)
        .await
        .map_err(|e| format!("lookup by {key} failed: {e}"))?;

    match existing {
        Some(found) => update_existing(store, collection, key, value, found, payload).await,
        None => match store.insert(collection, payload.clone()).await {
            Ok(created) => {
                created.id.ok_or_else(|| "store returned a record without id".to_string())
            }
            Err(StoreError::ConstraintViolation { .. }) => {
                let found = store
                    .find_one(collection, key, value)
                    .await
                    .map_err(|e| format!("lookup by {key} failed after constraint clash: {e}"))?
                    .ok_or_else(|| {
                        format!("{key}={value} clashed on insert but no existing record was found")
                    })?;
                update_existing(store, collection, key, value, found, payload).await
            }
            Err(e) => Err(format!("insert with {key}={value} failed: {e}")),
        },
    }
}

async fn update_existing<S: DataStore>(
    store: &S,
    collection: &str,
    key: &str,
    value: &Value,
    existing: Record,
    payload: Fields,
) -> Result<String, String> {
    let id = existing
        .id
        .ok_or_else(|| format!("existing record with {key}={value} has no id"))?;
    store
        .update(collection, &id, payload)
        .await
        .map_err(|e| format!("update of {key}={value} failed: {e}"))?;
    Ok(id)
}
