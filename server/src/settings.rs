use openscale_store::{MemoryEeprom, SettingsStore};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The settings store shared between request handlers.
///
/// Mutations take the write guard and keep it until the image is persisted,
/// so field writes never interleave and reach the database in order.
pub struct SharedStore(RwLock<SettingsStore<MemoryEeprom>>);

impl SharedStore {
    pub fn new(store: SettingsStore<MemoryEeprom>) -> Self {
        Self(RwLock::new(store))
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, SettingsStore<MemoryEeprom>> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, SettingsStore<MemoryEeprom>> {
        self.0.write().await
    }
}
