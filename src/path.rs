use crate::db::PathStore;
use crate::geo::path_length;
use crate::models::LatLon;
use tracing::{info, warn};

/// Append-only travel path with write-through persistence.
///
/// Points are kept in arrival order. A failed save is logged and otherwise
/// ignored; the in-memory path keeps growing.
pub struct PathAccumulator<S: PathStore> {
    points: Vec<LatLon>,
    store: S,
}

impl<S: PathStore> PathAccumulator<S> {
    pub fn new(store: S) -> Self {
        Self {
            points: Vec::new(),
            store,
        }
    }

    /// Replaces the in-memory path with whatever the store holds.
    pub fn restore(&mut self) {
        self.points = match self.store.load() {
            Ok(points) => {
                info!("Restored {} path points from storage", points.len());
                points
            }
            Err(e) => {
                warn!("Could not restore saved path: {}. Starting empty.", e);
                Vec::new()
            }
        };
    }

    pub fn append(&mut self, point: LatLon) {
        self.points.push(point);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.persist();
    }

    pub fn current(&self) -> &[LatLon] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn distance_m(&self) -> f64 {
        path_length(&self.points)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.points) {
            warn!("Failed to persist path ({} points): {}", self.points.len(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryPathStore, StorageError};

    struct FullDisk;

    fn disk_full() -> StorageError {
        StorageError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".to_string()),
        ))
    }

    impl PathStore for FullDisk {
        fn load(&self) -> Result<Vec<LatLon>, StorageError> {
            Err(disk_full())
        }

        fn save(&mut self, _points: &[LatLon]) -> Result<(), StorageError> {
            Err(disk_full())
        }
    }

    #[test]
    fn test_restore_then_append_keeps_restored_points_first() {
        let store = MemoryPathStore::with_points(&[LatLon(1.0, 1.0), LatLon(2.0, 2.0)]).unwrap();
        let mut path = PathAccumulator::new(store);
        path.restore();
        path.append(LatLon(3.0, 3.0));
        assert_eq!(
            path.current(),
            &[LatLon(1.0, 1.0), LatLon(2.0, 2.0), LatLon(3.0, 3.0)]
        );
    }

    #[test]
    fn test_append_writes_through() {
        let mut path = PathAccumulator::new(MemoryPathStore::default());
        path.append(LatLon(1.0, 2.0));
        path.append(LatLon(3.0, 4.0));
        assert_eq!(path.store().saves, 2);
        assert_eq!(path.store().load().unwrap(), path.current());
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let mut path = PathAccumulator::new(FullDisk);
        path.restore();
        assert!(path.is_empty());
        path.append(LatLon(1.0, 2.0));
        path.append(LatLon(3.0, 4.0));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_restore_replaces_wholesale() {
        let mut path = PathAccumulator::new(MemoryPathStore::default());
        path.append(LatLon(9.0, 9.0));
        path.clear();
        path.append(LatLon(1.0, 1.0));
        path.restore();
        assert_eq!(path.current(), &[LatLon(1.0, 1.0)]);
    }

    #[test]
    fn test_clear_persists_empty_path() {
        let mut path = PathAccumulator::new(MemoryPathStore::default());
        path.append(LatLon(1.0, 1.0));
        path.clear();
        assert!(path.is_empty());
        assert_eq!(path.store().raw(), Some("[]"));
    }
}
