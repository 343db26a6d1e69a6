//! State persistence: save and load the device map across restarts.
//!
//! Provides the `StatePersistence` trait and a `JsonFileState`
//! implementation that stores the whole map as one JSON object.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use revive_types::{DeviceId, DeviceRecoveryRecord};

use crate::error::{StateError, StateResult};

/// Every tracked device, keyed by platform id.
pub type DeviceMap = BTreeMap<DeviceId, DeviceRecoveryRecord>;

/// Trait for device map persistence across restarts.
pub trait StatePersistence: Send + Sync {
    /// Replace the persisted map with `records`.
    fn save(&self, records: &DeviceMap) -> StateResult<()>;

    /// Load the persisted map.
    ///
    /// Returns an empty map if nothing has been persisted yet.
    fn load(&self) -> StateResult<DeviceMap>;
}

/// JSON-file based persistence.
///
/// Writes are atomic (write to `.tmp`, then rename) so a crash mid-write
/// leaves the previous file intact.
pub struct JsonFileState {
    path: PathBuf,
}

impl JsonFileState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatePersistence for JsonFileState {
    fn save(&self, records: &DeviceMap) -> StateResult<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    fn load(&self) -> StateResult<DeviceMap> {
        if !self.path.exists() {
            return Ok(DeviceMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(DeviceMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| StateError::Corrupt(e.to_string()))
    }
}

/// In-memory persistence (for testing).
#[derive(Default)]
pub struct InMemoryState {
    data: Mutex<DeviceMap>,
    saves: Mutex<usize>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|count| *count).unwrap_or(0)
    }
}

impl StatePersistence for InMemoryState {
    fn save(&self, records: &DeviceMap) -> StateResult<()> {
        let mut data = self.data.lock().map_err(|_| StateError::LockPoisoned)?;
        *data = records.clone();
        let mut saves = self.saves.lock().map_err(|_| StateError::LockPoisoned)?;
        *saves += 1;
        Ok(())
    }

    fn load(&self) -> StateResult<DeviceMap> {
        let data = self.data.lock().map_err(|_| StateError::LockPoisoned)?;
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revive_types::PortId;

    fn record(host: &str, ip: &str, port: Option<&str>) -> DeviceRecoveryRecord {
        DeviceRecoveryRecord::new(host, ip, port.map(PortId::new))
    }

    #[test]
    fn json_round_trip_zero_one_many() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileState::new(dir.path().join("device_state.json"));

        let empty = DeviceMap::new();
        store.save(&empty).unwrap();
        assert_eq!(store.load().unwrap(), empty);

        let mut one = DeviceMap::new();
        one.insert(DeviceId::new("42"), record("edge-1", "10.0.0.5", Some("7")));
        store.save(&one).unwrap();
        assert_eq!(store.load().unwrap(), one);

        let mut many = one.clone();
        many.insert(DeviceId::new("43"), record("edge-2", "10.0.0.6", None));
        many.insert(DeviceId::new("44"), record("core-1", "10.0.1.1", Some("90")));
        store.save(&many).unwrap();
        assert_eq!(store.load().unwrap(), many);
    }

    #[test]
    fn json_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileState::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn json_load_empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device_state.json");
        std::fs::write(&path, "  \n").unwrap();

        let store = JsonFileState::new(&path);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn json_load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device_state.json");
        std::fs::write(&path, "{\"42\": ").unwrap();

        let store = JsonFileState::new(&path);
        assert!(matches!(store.load(), Err(StateError::Corrupt(_))));
    }

    #[test]
    fn json_save_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("device_state.json");
        let store = JsonFileState::new(&path);

        store.save(&DeviceMap::new()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn in_memory_counts_saves() {
        let store = InMemoryState::new();
        store.save(&DeviceMap::new()).unwrap();
        store.save(&DeviceMap::new()).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
