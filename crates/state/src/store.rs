//! Status storage backends

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use webforge_errors::{Error, StateError};
use webforge_types::{BuildId, BuildRecord};

/// Callback applied to a record under the store's per-key lock
pub type RecordUpdate<'a> = &'a mut dyn FnMut(&mut BuildRecord) -> Result<(), Error>;

/// Storage for build records
///
/// Implementations must make every operation on one identifier atomic with
/// respect to the others on that identifier. Nothing here may block on
/// another build's record.
pub trait StatusStore: Send + Sync {
    /// Add a new record
    ///
    /// # Errors
    ///
    /// Returns `StateError::AlreadyExists` if the identifier is taken.
    fn insert(&self, record: BuildRecord) -> Result<(), Error>;

    /// Snapshot of a record
    fn get(&self, id: &BuildId) -> Option<BuildRecord>;

    /// Apply `update` atomically and return the new snapshot.
    ///
    /// When `update` fails the stored record is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StateError::BuildNotFound` for unknown identifiers, or the
    /// error produced by `update`.
    fn update(&self, id: &BuildId, update: RecordUpdate<'_>) -> Result<BuildRecord, Error>;

    /// Every known identifier
    fn ids(&self) -> Vec<BuildId>;
}

/// Process-local store; records live until the process exits
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: DashMap<BuildId, BuildRecord>,
}

impl MemoryStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn insert(&self, record: BuildRecord) -> Result<(), Error> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(StateError::AlreadyExists {
                build_id: record.id.to_string(),
            }
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn get(&self, id: &BuildId) -> Option<BuildRecord> {
        self.records.get(id).map(|record| record.value().clone())
    }

    fn update(&self, id: &BuildId, update: RecordUpdate<'_>) -> Result<BuildRecord, Error> {
        let mut slot = self.records.get_mut(id).ok_or_else(|| StateError::BuildNotFound {
            build_id: id.to_string(),
        })?;
        let mut draft = slot.value().clone();
        update(&mut draft)?;
        *slot.value_mut() = draft.clone();
        Ok(draft)
    }

    fn ids(&self) -> Vec<BuildId> {
        self.records.iter().map(|record| *record.key()).collect()
    }
}
