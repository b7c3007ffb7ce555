use super::{decode_entry, encode_entry, CacheBackend, CacheKey};
use crate::error::Result;
use crate::models::StarRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local backend. Entries are kept encoded so reads go through the
/// same codec as the durable backends.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<StarRecord>>> {
        match self.entries.read().await.get(key) {
            Some(bytes) => Ok(Some(decode_entry(bytes)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &CacheKey, records: &[StarRecord]) -> Result<()> {
        let bytes = encode_entry(records)?;
        self.entries.write().await.insert(key.clone(), bytes);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
