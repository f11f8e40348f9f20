//! 证书 PDF 的 Blob 存储抽象
//!
//! 根据配置选择实现：
//! - `local` → LocalBlobStore（写本地目录，由 `public_base_url` 对外提供）
//! - `http`  → HttpBlobStore（PUT 到对象存储网关）
//!
//! 测试使用 MemoryBlobStore。

mod http;
mod local;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::config::{CertificateConfig, CertificateStorage};
use crate::errors::{LmsError, Result};

pub use http::HttpBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Blob 存储 trait
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 写入对象，返回可公开访问的 URL
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    async fn get(&self, key: &str) -> Result<Bytes>;

    /// 删除对象；对象不存在不算错误
    async fn delete(&self, key: &str) -> Result<()>;

    /// 获取实现名称（用于日志、健康检查）
    fn name(&self) -> &'static str;
}

/// 拒绝空 key、绝对路径和 `..` 片段
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(LmsError::blob_storage(format!("Invalid blob key: {:?}", key)));
    }
    Ok(())
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// 按配置创建 Blob 存储
pub fn create_blob_store(config: &CertificateConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.storage {
        CertificateStorage::Local => Arc::new(LocalBlobStore::new(
            &config.local_dir,
            &config.public_base_url,
        )),
        CertificateStorage::Http => {
            if config.http_endpoint.is_empty() {
                return Err(LmsError::blob_storage(
                    "certificates.http_endpoint is required when storage = \"http\"",
                ));
            }
            Arc::new(HttpBlobStore::new(
                &config.http_endpoint,
                config.http_token.clone(),
            ))
        }
    };

    info!("Certificate blob store: {}", store.name());
    Ok(store)
}
