//! Uploaded images: prescriptions and courier ID documents.

use std::{env, sync::Arc, time::Duration};

use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream};
use chrono::{DateTime, Utc};

use crate::{errors::Error, i18n::MessageKey};

const CACHE_CONTROL: &str = "max-age=3600";
const DEFAULT_EXTENSION: &str = "jpg";
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Bucket {
    /// Public, linked from requests
    Prescriptions,
    /// Private, read through presigned URLs
    IdDocuments,
}

impl Bucket {
    pub fn is_public(self) -> bool {
        matches!(self, Bucket::Prescriptions)
    }
}

/// One file taken from a multipart form.
#[derive(Clone, Debug, Default)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `"{subject}/{unix_millis}.{ext}"`, the extension lower-cased.
pub fn object_key(subject: &str, at: DateTime<Utc>, file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{subject}/{}.{extension}", at.timestamp_millis())
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the bytes under `key` and returns a URL to read them back.
    async fn put(&self, bucket: Bucket, key: &str, upload: &Upload) -> Result<String, Error>;
}

#[derive(Clone, Debug)]
pub struct BucketNames {
    pub prescriptions: String,
    pub id_documents: String,
}

impl BucketNames {
    pub fn from_env() -> Self {
        Self {
            prescriptions: env::var("PRESCRIPTIONS_BUCKET")
                .unwrap_or("medifast-prescriptions".to_string()),
            id_documents: env::var("ID_DOCUMENTS_BUCKET")
                .unwrap_or("medifast-id-documents".to_string()),
        }
    }

    fn name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Prescriptions => &self.prescriptions,
            Bucket::IdDocuments => &self.id_documents,
        }
    }
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    buckets: BucketNames,
    signed_url_ttl: Duration,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, buckets: BucketNames, signed_url_ttl: Duration) -> Self {
        Self {
            client,
            buckets,
            signed_url_ttl,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, bucket: Bucket, key: &str, upload: &Upload) -> Result<String, Error> {
        let bucket_name = self.buckets.name(bucket);

        self.client
            .put_object()
            .bucket(bucket_name)
            .key(key)
            .body(ByteStream::from(upload.bytes.clone()))
            .set_content_type(upload.content_type.clone())
            .cache_control(CACHE_CONTROL)
            .send()
            .await
            .map_err(Error::storage)?;

        if bucket.is_public() {
            return Ok(format!("https://{bucket_name}.s3.amazonaws.com/{key}"));
        }

        let presigning = PresigningConfig::expires_in(self.signed_url_ttl).map_err(Error::storage)?;
        let presigned = self
            .client
            .get_object()
            .bucket(bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(Error::storage)?;

        Ok(presigned.uri().to_string())
    }
}

/// Places uploads under the subject's folder of a bucket.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn upload(&self, bucket: Bucket, subject: &str, upload: &Upload) -> Result<String, Error> {
        if upload.is_empty() {
            return Err(Error::validation("file", MessageKey::NoFileSelected));
        }

        let key = object_key(subject, Utc::now(), &upload.file_name);
        let url = self.store.put(bucket, &key, upload).await?;

        tracing::info!(?bucket, key, size = upload.bytes.len(), "File uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::memory::MemoryObjectStore;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_718_000_000_123).unwrap()
    }

    #[test]
    fn key_keeps_the_lowercased_extension() {
        assert_eq!(
            object_key("user-1", at(), "Rezept.PNG"),
            "user-1/1718000000123.png"
        );
    }

    #[test]
    fn key_defaults_to_jpg() {
        assert_eq!(object_key("user-1", at(), "scan"), "user-1/1718000000123.jpg");
        assert_eq!(object_key("user-1", at(), "scan."), "user-1/1718000000123.jpg");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let store = Arc::new(MemoryObjectStore::default());
        let uploader = Uploader::new(store.clone());

        let err = uploader
            .upload(Bucket::Prescriptions, "user-1", &Upload::default())
            .await
            .unwrap_err();

        assert_eq!(err.message_key(), MessageKey::NoFileSelected);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn upload_lands_in_the_subject_folder() {
        let store = Arc::new(MemoryObjectStore::default());
        let uploader = Uploader::new(store.clone());
        let upload = Upload {
            file_name: "rx.jpeg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8],
        };

        let url = uploader
            .upload(Bucket::IdDocuments, "user-1", &upload)
            .await
            .unwrap();

        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("user-1/"));
        assert!(keys[0].ends_with(".jpeg"));
        assert!(url.contains(&keys[0]));
    }
}
