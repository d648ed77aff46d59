use std::collections::HashMap;

use chrono::Utc;

use crate::errors::BackupError;
use crate::store::{AuthProvider, DataStore};

use super::schema::COLLECTIONS;
use super::types::{SNAPSHOT_VERSION, Snapshot};

/// Export every collection, leaves first, into a portable snapshot.
///
/// Read-only against the store. A collection whose fetch fails is recorded
/// as empty and the export carries on, so the document is always complete.
pub async fn export_snapshot<S, A>(store: &S, auth: &A) -> Result<Snapshot, BackupError>
where
    S: DataStore,
    A: AuthProvider,
{
    let identity = auth.current_identity().ok_or(BackupError::NotAuthenticated)?;

    let mut data = HashMap::new();
    for spec in COLLECTIONS {
        let records = match store.fetch_all(spec.name, "created_at").await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("export: fetching {} failed, writing it empty: {e}", spec.name);
                Vec::new()
            }
        };
        data.insert(spec.name.to_string(), records);
    }

    log::info!(
        "export: {} collections, {} records",
        data.len(),
        data.values().map(Vec::len).sum::<usize>()
    );

    Ok(Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        created_at: Utc::now().to_rfc3339(),
        created_by: identity.id,
        created_by_email: identity.email,
        data,
    })
}

/// Download filename for a snapshot: the export timestamp made
/// filesystem-safe (`:` and `.` become `-`) so files sort chronologically.
pub fn backup_file_name(snapshot: &Snapshot) -> String {
    let stamp = snapshot.created_at.replace([':', '.'], "-");
    format!("ledgerkit-backup-{stamp}.json")
}
