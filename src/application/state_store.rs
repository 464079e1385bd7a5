use crate::domain::models::Snapshot;
use crate::infrastructure::error::InfraError;
use std::sync::{Mutex, MutexGuard};

/// Sole owner of the in-memory snapshot. Guards are never held across `.await`.
#[derive(Debug, Default)]
pub struct StateStore {
    snapshot: Mutex<Snapshot>,
}

impl StateStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, InfraError> {
        Ok(self.lock()?.clone())
    }

    pub fn replace(&self, snapshot: Snapshot) -> Result<(), InfraError> {
        *self.lock()? = snapshot;
        Ok(())
    }

    pub fn read<T>(&self, reader: impl FnOnce(&Snapshot) -> T) -> Result<T, InfraError> {
        let guard = self.lock()?;
        Ok(reader(&guard))
    }

    pub fn update<T>(&self, writer: impl FnOnce(&mut Snapshot) -> T) -> Result<T, InfraError> {
        let mut guard = self.lock()?;
        Ok(writer(&mut guard))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Snapshot>, InfraError> {
        self.snapshot
            .lock()
            .map_err(|error| InfraError::StateLock(format!("snapshot lock poisoned: {error}")))
    }
}
