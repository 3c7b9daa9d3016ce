use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// Byte oriented object storage addressed by `(location, identifier)`.
pub trait ObjectStore {
    /// Whole-object read. [`RelayError::ObjectNotFound`] when nothing is
    /// stored under the identifier.
    fn read(&self, location: &str, identifier: &str)
        -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Unconditional put; the last writer wins.
    fn write(
        &self,
        location: &str,
        identifier: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Removing an absent object succeeds.
    fn delete(&self, location: &str, identifier: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Moves payloads from wherever a notification points to the configured
/// destination, under the same identifier.
pub struct StorageRelay<'a, S> {
    store: &'a S,
    destination: &'a str,
    delete_source_after_relay: bool,
}

impl<'a, S: ObjectStore> StorageRelay<'a, S> {
    pub fn new(store: &'a S, destination: &'a str, delete_source_after_relay: bool) -> Self {
        Self {
            store,
            destination,
            delete_source_after_relay,
        }
    }

    pub fn destination(&self) -> &str {
        self.destination
    }

    pub async fn read_source(&self, location: &str, identifier: &str) -> Result<Vec<u8>> {
        let body = self.store.read(location, identifier).await?;
        debug!(location, identifier, bytes = body.len(), "read source object");
        Ok(body)
    }

    pub async fn write_destination(&self, identifier: &str, body: Vec<u8>) -> Result<()> {
        let bytes = body.len();
        self.store.write(self.destination, identifier, body).await?;
        info!(destination = self.destination, identifier, bytes, "wrote decrypted object");
        Ok(())
    }

    /// Deletes the source when configured to. Returns whether a delete was
    /// issued.
    pub async fn remove_source(&self, location: &str, identifier: &str) -> Result<bool> {
        if !self.delete_source_after_relay {
            return Ok(false);
        }
        self.store.delete(location, identifier).await?;
        info!(location, identifier, "deleted source object");
        Ok(true)
    }
}

/// Process-local store, used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: &str, identifier: &str, body: impl Into<Vec<u8>>) {
        self.lock()
            .insert((location.to_string(), identifier.to_string()), body.into());
    }

    pub fn get(&self, location: &str, identifier: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(location.to_string(), identifier.to_string()))
            .cloned()
    }

    pub fn contains(&self, location: &str, identifier: &str) -> bool {
        self.get(location, identifier).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        // a poisoned map is still structurally valid
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObjectStore for InMemoryObjectStore {
    async fn read(&self, location: &str, identifier: &str) -> Result<Vec<u8>> {
        self.get(location, identifier)
            .ok_or_else(|| RelayError::ObjectNotFound {
                location: location.to_string(),
                identifier: identifier.to_string(),
            })
    }

    async fn write(&self, location: &str, identifier: &str, body: Vec<u8>) -> Result<()> {
        self.insert(location, identifier, body);
        Ok(())
    }

    async fn delete(&self, location: &str, identifier: &str) -> Result<()> {
        self.lock()
            .remove(&(location.to_string(), identifier.to_string()));
        Ok(())
    }
}
