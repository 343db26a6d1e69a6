//! Device state store
//!
//! The in-memory map is the source of truth while the process runs; every
//! mutation writes the whole map through the configured persistence while
//! still holding the write lock, so the file never reflects a half-applied
//! change. Saves run on the blocking pool so file IO never stalls a runtime
//! worker. Persistence failures are logged and degrade durability only.

use std::sync::Arc;

use revive_types::{DeviceId, DeviceRecoveryRecord, PortId};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::persistence::{DeviceMap, StatePersistence};

/// Fields carried by an alert for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub hostname: String,
    pub address: String,
    pub interface: Option<PortId>,
}

/// Result of registering an alert against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A new recovery episode started.
    Created(DeviceRecoveryRecord),

    /// The device was already tracked; the episode's original address and
    /// start time were kept.
    Rearmed(DeviceRecoveryRecord),
}

impl RegisterOutcome {
    pub fn record(&self) -> &DeviceRecoveryRecord {
        match self {
            RegisterOutcome::Created(record) | RegisterOutcome::Rearmed(record) => record,
        }
    }
}

/// Result of a conditional removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Intake wrote the record after the caller observed it.
    Superseded { current_revision: u64 },
    Missing,
}

/// Shared store of devices that are not yet recovered.
pub struct DeviceStateStore {
    records: RwLock<DeviceMap>,
    persistence: Arc<dyn StatePersistence>,
}

impl DeviceStateStore {
    /// Open the store, loading whatever the persistence layer holds.
    ///
    /// An unreadable store is treated as empty.
    pub fn open(persistence: Arc<dyn StatePersistence>) -> Self {
        let records = match persistence.load() {
            Ok(records) => {
                info!(devices = records.len(), "Loaded device state");
                records
            }
            Err(e) => {
                warn!(error = %e, "Device state unreadable; starting empty");
                DeviceMap::new()
            }
        };

        Self {
            records: RwLock::new(records),
            persistence,
        }
    }

    /// Register an alert for `device_id`.
    ///
    /// A tracked device keeps its original address and episode start; its
    /// hostname is refreshed and a newly resolved interface replaces the
    /// stored one. The revision is bumped either way.
    pub async fn register(
        &self,
        device_id: &DeviceId,
        registration: Registration,
    ) -> RegisterOutcome {
        let mut records = self.records.write().await;

        let outcome = match records.get_mut(device_id) {
            Some(existing) => {
                if existing.original_address != registration.address {
                    debug!(
                        device_id = %device_id,
                        kept = %existing.original_address,
                        ignored = %registration.address,
                        "Keeping original address of in-flight recovery"
                    );
                }
                existing.hostname = registration.hostname;
                if registration.interface.is_some() {
                    existing.tracked_interface_id = registration.interface;
                }
                existing.revision += 1;
                RegisterOutcome::Rearmed(existing.clone())
            }
            None => {
                let record = DeviceRecoveryRecord::new(
                    registration.hostname,
                    registration.address,
                    registration.interface,
                );
                records.insert(device_id.clone(), record.clone());
                RegisterOutcome::Created(record)
            }
        };

        self.persist(&records).await;
        outcome
    }

    pub async fn get(&self, device_id: &DeviceId) -> Option<DeviceRecoveryRecord> {
        self.records.read().await.get(device_id).cloned()
    }

    pub async fn contains(&self, device_id: &DeviceId) -> bool {
        self.records.read().await.contains_key(device_id)
    }

    /// Point-in-time copy of every tracked device.
    pub async fn snapshot(&self) -> Vec<(DeviceId, DeviceRecoveryRecord)> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Store a resolved interface id. Returns `false` if the device is no
    /// longer tracked.
    pub async fn set_interface_id(&self, device_id: &DeviceId, port_id: PortId) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(device_id) else {
            return false;
        };
        record.tracked_interface_id = Some(port_id);
        self.persist(&records).await;
        true
    }

    /// Count one more failed attempt. Returns the new total.
    pub async fn record_failed_attempt(&self, device_id: &DeviceId) -> Option<u32> {
        let mut records = self.records.write().await;
        let record = records.get_mut(device_id)?;
        record.attempts = record.attempts.saturating_add(1);
        let attempts = record.attempts;
        self.persist(&records).await;
        Some(attempts)
    }

    /// Remove the device only if no intake write happened since `revision`
    /// was observed.
    pub async fn remove_if_revision(&self, device_id: &DeviceId, revision: u64) -> Removal {
        let mut records = self.records.write().await;

        let current_revision = match records.get(device_id) {
            None => return Removal::Missing,
            Some(record) => record.revision,
        };

        if current_revision != revision {
            return Removal::Superseded { current_revision };
        }

        records.remove(device_id);
        self.persist(&records).await;
        Removal::Removed
    }

    async fn persist(&self, records: &DeviceMap) {
        let persistence = self.persistence.clone();
        let snapshot = records.clone();

        match tokio::task::spawn_blocking(move || persistence.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to persist device state; continuing in memory")
            }
            Err(e) => warn!(error = %e, "Device state save task failed; continuing in memory"),
        }
    }
}
