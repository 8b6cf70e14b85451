//! In-memory metadata store for completed acquisitions
//!
//! Maps the opaque acquisition id to the human-readable title, download
//! filename, kind, and size. Records live for the lifetime of the
//! process; there is no eviction in the current scope.

use mediastem_common::types::MediaKind;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Created exactly once per successful acquisition
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionRecord {
    pub id: Uuid,
    /// Sanitized title (no extension)
    pub title: String,
    /// Download filename presented to the client, extension included
    pub filename: String,
    pub kind: MediaKind,
    pub byte_size: u64,
}

#[derive(Default)]
pub struct MetadataStore {
    records: RwLock<HashMap<Uuid, AcquisitionRecord>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: AcquisitionRecord) {
        let mut records = self.records.write().expect("store lock poisoned");
        records.insert(record.id, record);
    }

    pub fn get(&self, id: &Uuid) -> Option<AcquisitionRecord> {
        let records = self.records.read().expect("store lock poisoned");
        records.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
