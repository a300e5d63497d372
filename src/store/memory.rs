//! In-memory credential store used by tests and local development.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{ClientCredential, CredentialStore, StoreError, StoreFuture};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<i64, ClientCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_id(&self, client_id: i64) -> StoreFuture<'_, ClientCredential> {
        Box::pin(async move {
            let records = self.records.lock().await;
            records.get(&client_id).cloned().ok_or(StoreError::NotFound)
        })
    }

    fn touch(&self, client_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut records = self.records.lock().await;
            let record = records.get_mut(&client_id).ok_or(StoreError::NotFound)?;
            // last-write-wins, but never backwards
            record.last_used_at = Some(record.last_used_at.map_or(at, |prev| prev.max(at)));
            Ok(())
        })
    }

    fn create(&self, credential: ClientCredential) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut records = self.records.lock().await;
            if records.contains_key(&credential.client_id) {
                return Err(StoreError::Duplicate);
            }
            records.insert(credential.client_id, credential);
            Ok(())
        })
    }
}
