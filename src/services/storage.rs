use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Size and modification facts for a stored document. `modified` rendered
/// as RFC3339 doubles as the opaque WOPI version string.
#[derive(Debug, Clone)]
pub struct DocumentStat {
    pub size: i64,
    pub modified: DateTime<Utc>,
}

impl DocumentStat {
    /// WOPI version string: millisecond ISO-8601 of the mtime. Clients must
    /// treat it as opaque, only ever comparing for change.
    pub fn version(&self) -> String {
        self.modified
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// Backing content store for WOPI documents. `Ok(None)` means the document
/// does not exist; `Err` is an infrastructure failure.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn stat(&self, file_id: &str) -> Result<Option<DocumentStat>>;
    async fn read(&self, file_id: &str) -> Result<Option<Vec<u8>>>;
    /// Replace the document atomically: either the full new content lands
    /// or the previous content survives, never a partial write.
    async fn write(&self, file_id: &str, data: Vec<u8>) -> Result<()>;
}

/// Filesystem-backed store, one document per file under a content directory.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, file_id: &str) -> Result<PathBuf> {
        // The route layer already rejects these; keep the store safe on its own.
        if !crate::utils::wopi::is_valid_file_id(file_id) {
            anyhow::bail!("invalid file id: {:?}", file_id);
        }
        Ok(self.root.join(file_id))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn stat(&self, file_id: &str) -> Result<Option<DocumentStat>> {
        let path = self.path_for(file_id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(DocumentStat {
                size: meta.len() as i64,
                modified: DateTime::<Utc>::from(meta.modified()?),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(file_id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, file_id: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(file_id)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write to a sibling temp file, then rename over the target. Rename
        // within one directory is atomic, so a failed write never leaves a
        // truncated document behind.
        let tmp = self.root.join(format!(".{}.tmp", file_id));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// S3/MinIO-backed store, one object per document.
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn stat(&self, file_id: &str) -> Result<Option<DocumentStat>> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(file_id)
            .send()
            .await;

        match res {
            Ok(head) => {
                let modified = head
                    .last_modified()
                    .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_else(Utc::now);
                Ok(Some(DocumentStat {
                    size: head.content_length().unwrap_or(0),
                    modified,
                }))
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn read(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(file_id)
            .send()
            .await;

        match res {
            Ok(output) => Ok(Some(output.body.collect().await?.into_bytes().to_vec())),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn write(&self, file_id: &str, data: Vec<u8>) -> Result<()> {
        // PutObject is all-or-nothing on the S3 side.
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(file_id)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }
}
