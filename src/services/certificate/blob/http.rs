//! HTTP 对象存储网关
//!
//! `PUT {endpoint}/{key}` 上传，`GET` 下载，`DELETE` 删除，可选 Bearer token。

use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};
use ureq::Agent;

use super::{BlobStore, join_url, validate_key};
use crate::errors::{LmsError, Result};

/// HTTP 请求超时时间
const HTTP_TIMEOUT_SECS: u64 = 30;
/// 下载大小上限
const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// 全局 HTTP Agent（ureq 的 Agent 是 Send + Sync）
static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

pub struct HttpBlobStore {
    endpoint: String,
    token: Option<String>,
}

enum Op {
    Put(Bytes, String),
    Get,
    Delete,
}

impl HttpBlobStore {
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// 同步执行请求（在 spawn_blocking 中调用）
    fn execute_sync(url: String, token: Option<String>, op: Op) -> Result<Option<Bytes>> {
        let agent = get_agent();
        let auth = token.map(|t| format!("Bearer {}", t));

        let result = match op {
            Op::Put(data, content_type) => {
                let mut req = agent.put(&url).header("Content-Type", &content_type);
                if let Some(auth) = &auth {
                    req = req.header("Authorization", auth);
                }
                req.send(&data[..]).map(|_| None)
            }
            Op::Get => {
                let mut req = agent.get(&url);
                if let Some(auth) = &auth {
                    req = req.header("Authorization", auth);
                }
                match req.call() {
                    Ok(resp) => {
                        let mut buf = Vec::new();
                        resp.into_body()
                            .into_reader()
                            .take(MAX_DOWNLOAD_BYTES)
                            .read_to_end(&mut buf)
                            .map_err(|e| {
                                LmsError::blob_storage(format!("Read {} failed: {}", url, e))
                            })?;
                        Ok(Some(Bytes::from(buf)))
                    }
                    Err(e) => Err(e),
                }
            }
            Op::Delete => {
                let mut req = agent.delete(&url);
                if let Some(auth) = &auth {
                    req = req.header("Authorization", auth);
                }
                match req.call() {
                    Ok(_) | Err(ureq::Error::StatusCode(404)) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        };

        result.map_err(|e| match e {
            ureq::Error::StatusCode(404) => LmsError::not_found(format!("Blob not found: {}", url)),
            other => LmsError::blob_storage(format!("Request to {} failed: {}", url, other)),
        })
    }

    async fn execute(&self, key: &str, op: Op) -> Result<Option<Bytes>> {
        validate_key(key)?;
        let url = join_url(&self.endpoint, key);
        let token = self.token.clone();

        tokio::task::spawn_blocking(move || Self::execute_sync(url, token, op))
            .await
            .map_err(|e| {
                warn!("Blob request spawn_blocking failed: {}", e);
                LmsError::blob_storage(format!("Blob request task failed: {}", e))
            })?
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let size = data.len();
        self.execute(key, Op::Put(data, content_type.to_string()))
            .await?;
        debug!("Blob uploaded: {} ({} bytes)", key, size);
        Ok(join_url(&self.endpoint, key))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.execute(key, Op::Get)
            .await?
            .ok_or_else(|| LmsError::blob_storage(format!("Empty response for {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.execute(key, Op::Delete).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_ignored() {
        let store = HttpBlobStore::new("https://blobs.example.com", Some(String::new()));
        assert!(store.token.is_none());
        assert_eq!(store.name(), "http");
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_request() {
        let store = HttpBlobStore::new("http://127.0.0.1:9", None);
        let err = store.get("../x").await.unwrap_err();
        assert!(matches!(err, LmsError::BlobStorage(_)));
    }
}
