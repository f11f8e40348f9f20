use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{BlobStore, validate_key};
use crate::errors::{LmsError, Result};

/// 内存存储（测试和本地演示）
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, (Bytes, String)>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        validate_key(key)?;
        self.objects
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(format!("memory://{}", key))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().0.clone())
            .ok_or_else(|| LmsError::not_found(format!("Blob not found: {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
