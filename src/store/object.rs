use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use opendal::layers::TimeoutLayer;
use opendal::services::{Memory, S3};
use opendal::Operator;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::BackendError;
use crate::store::{RemoteStore, StoreConfig};
use crate::sync::identity::{is_md5_hex, md5_bytes, CHUNK_SIZE};
use crate::sync::{inventory_key, FileIdentity, FileInventory};

/// User metadata key holding the MD5 of the original content
pub const META_MD5: &str = "md5";
/// User metadata key holding the original size in bytes
pub const META_SIZE: &str = "size";
/// User metadata key holding the original modification time
pub const META_MTIME: &str = "mtime";

/// Timeout for metadata operations (stat, list pages)
pub const OP_TIMEOUT_SECS: u64 = 60;
/// Timeout for a single read or write
pub const IO_TIMEOUT_SECS: u64 = 300;

/// Part size for uploads; S3 rejects multipart parts under 5 MiB
pub const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Objects stat'ed concurrently while listing
pub const STAT_CONCURRENCY: usize = 16;

/// Connection settings for S3 and S3-compatible services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Options {
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, Wasabi, ...)
    pub endpoint: Option<String>,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

/// Object storage backend using OpenDAL.
///
/// The configured prefix becomes the operator root, so every key the store
/// sees is already relative to it.
pub struct ObjectStore {
    operator: Operator,
    config: StoreConfig,
    name: String,
    user_metadata: bool,
}

impl ObjectStore {
    /// Create an S3 store. Credentials come from the standard AWS chain
    /// (environment, shared credentials file, instance profile).
    pub fn s3(config: StoreConfig, options: &S3Options) -> Result<Self, BackendError> {
        if config.bucket.is_empty() {
            return Err(BackendError::Config("bucket name must not be empty".to_string()));
        }

        let mut builder = S3::default()
            .bucket(&config.bucket)
            .root(&config.prefix)
            .region(&options.region);

        if let Some(endpoint) = &options.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|source| BackendError::Storage {
                key: config.bucket.clone(),
                source,
            })?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        let name = format!("s3://{}{}", config.bucket, config.prefix.trim_end_matches('/'));
        Ok(Self::with_name(operator, config, name))
    }

    /// Create a store backed by process memory. Used for local testing.
    pub fn memory(config: StoreConfig) -> Result<Self, BackendError> {
        let builder = Memory::default().root(&config.prefix);
        let operator = Operator::new(builder)
            .map_err(|source| BackendError::Storage {
                key: config.prefix.clone(),
                source,
            })?
            .finish();

        let name = format!("memory://{}{}", config.bucket, config.prefix.trim_end_matches('/'));
        Ok(Self::with_name(operator, config, name))
    }

    /// Wrap an operator whose root already points at the prefix.
    pub fn from_operator(operator: Operator, config: StoreConfig) -> Self {
        let name = format!("{}{}", config.bucket, config.prefix);
        Self::with_name(operator, config, name)
    }

    fn with_name(operator: Operator, config: StoreConfig, name: String) -> Self {
        let user_metadata = operator.info().full_capability().write_with_user_metadata;
        debug!(store = %name, user_metadata, "remote store ready");
        Self {
            operator,
            config,
            name,
            user_metadata,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn storage_error(key: &str, source: opendal::Error) -> BackendError {
        BackendError::Storage {
            key: key.to_string(),
            source,
        }
    }

    /// Identity of a stored object.
    ///
    /// The hash comes from our own `md5` metadata when present, then from a
    /// plain MD5 ETag, and as a last resort from the object content.
    async fn remote_identity(&self, key: &str) -> Result<FileIdentity, BackendError> {
        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| Self::storage_error(key, e))?;
        let user = meta.user_metadata();
        let lookup = |name: &str| user.and_then(|m| m.get(name));

        let size_bytes = lookup(META_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| meta.content_length());
        let mod_time = lookup(META_MTIME)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let content_hash = match lookup(META_MD5) {
            Some(hash) => hash.clone(),
            None => match meta.etag().map(|e| e.trim_matches('"')).filter(|e| is_md5_hex(e)) {
                Some(etag) => etag.to_lowercase(),
                None => {
                    debug!(key, "no stored checksum, hashing object content");
                    let content = self
                        .operator
                        .read(key)
                        .await
                        .map_err(|e| Self::storage_error(key, e))?;
                    md5_bytes(&content.to_vec())
                }
            },
        };

        Ok(FileIdentity {
            size_bytes,
            mod_time,
            content_hash,
        })
    }

    fn metadata_for(identity: &FileIdentity) -> HashMap<String, String> {
        HashMap::from([
            (META_MD5.to_string(), identity.content_hash.clone()),
            (META_SIZE.to_string(), identity.size_bytes.to_string()),
            (META_MTIME.to_string(), identity.mod_time.to_string()),
        ])
    }
}

#[async_trait]
impl RemoteStore for ObjectStore {
    async fn list_files(&self) -> Result<FileInventory, BackendError> {
        let entries = self
            .operator
            .list_with("")
            .recursive(true)
            .await
            .map_err(|e| Self::storage_error(&self.config.prefix, e))?;

        // Skip the root and directory markers
        let keys: Vec<String> = entries
            .iter()
            .map(|entry| entry.path())
            .filter(|key| !key.is_empty() && !key.ends_with('/'))
            .map(str::to_string)
            .collect();

        let identities: Vec<(String, FileIdentity)> = stream::iter(keys)
            .map(|key| async move {
                let identity = self.remote_identity(&key).await?;
                Ok::<_, BackendError>((key, identity))
            })
            .buffer_unordered(STAT_CONCURRENCY)
            .try_collect()
            .await?;

        let inventory: FileInventory = identities
            .into_iter()
            .map(|(key, identity)| (key.trim_start_matches('/').to_string(), identity))
            .collect();

        debug!(store = %self.name, count = inventory.len(), "listed remote files");
        Ok(inventory)
    }

    async fn put_file(&self, path: &str, identity: &FileIdentity) -> Result<(), BackendError> {
        let key = inventory_key(path);

        if self.config.dry_run {
            info!(path, key = %key, size = identity.size_bytes, "dry run: would upload file");
            return Ok(());
        }

        let io_error = |source: std::io::Error| BackendError::Io {
            path: path.into(),
            source,
        };
        let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;

        let mut writer = self.operator.writer_with(&key).chunk(UPLOAD_CHUNK_SIZE);
        if self.user_metadata {
            writer = writer.user_metadata(Self::metadata_for(identity));
        }
        let mut writer = writer.await.map_err(|e| Self::storage_error(&key, e))?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let bytes_read = match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(source) => {
                    let _ = writer.abort().await;
                    return Err(io_error(source));
                }
            };
            if let Err(e) = writer.write(buffer[..bytes_read].to_vec()).await {
                let _ = writer.abort().await;
                return Err(Self::storage_error(&key, e));
            }
        }
        writer.close().await.map_err(|e| Self::storage_error(&key, e))?;

        debug!(path, key = %key, size = identity.size_bytes, "uploaded file");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
