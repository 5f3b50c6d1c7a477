use asphalt_shared::bounds::ViewportBounds;
use asphalt_shared::models::{HazardRecord, LatLng, RawSeverity};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const HAZARDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("hazards");

/// A hazard as persisted by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHazard {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: RawSeverity,
    pub detections: usize,
    pub created_at: String,
}

impl StoredHazard {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

impl From<StoredHazard> for HazardRecord {
    fn from(h: StoredHazard) -> Self {
        HazardRecord {
            id: Some(h.id.to_string()),
            latitude: h.latitude,
            longitude: h.longitude,
            severity: h.severity,
        }
    }
}

pub struct Storage {
    db: Database,
}

impl Storage {
    pub fn open(path: &Path) -> Arc<Self> {
        let db = Database::create(path)
            .unwrap_or_else(|e| panic!("Failed to open database at {}: {}", path.display(), e));

        // Ensure table exists
        let write_txn = db.begin_write().expect("Failed to begin write txn");
        {
            let _ = write_txn.open_table(HAZARDS_TABLE);
        }
        write_txn.commit().expect("Failed to commit initial txn");

        Arc::new(Storage { db })
    }

    pub fn save_hazard(&self, hazard: &StoredHazard) -> Result<(), String> {
        let json = serde_json::to_vec(hazard).map_err(|e| e.to_string())?;
        let id_str = hazard.id.to_string();

        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut table = write_txn
                .open_table(HAZARDS_TABLE)
                .map_err(|e| e.to_string())?;
            table
                .insert(id_str.as_str(), json.as_slice())
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// All stored hazards inside `bounds` (edges inclusive). Rows that fail to
    /// decode are logged and skipped.
    pub fn hazards_within(&self, bounds: &ViewportBounds) -> Result<Vec<StoredHazard>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(HAZARDS_TABLE)
            .map_err(|e| e.to_string())?;

        let mut hazards = Vec::new();
        for entry in table.iter().map_err(|e| e.to_string())? {
            let (key, value) = entry.map_err(|e| e.to_string())?;
            match serde_json::from_slice::<StoredHazard>(value.value()) {
                Ok(hazard) if bounds.contains(hazard.position()) => hazards.push(hazard),
                Ok(_) => {}
                Err(e) => tracing::warn!(id = key.value(), error = %e, "skipping corrupt hazard row"),
            }
        }
        Ok(hazards)
    }

    pub fn count_hazards(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(HAZARDS_TABLE)
            .map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }
}
