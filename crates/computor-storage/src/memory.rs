//! An in-memory [`ObjectStoreBackend`] used by integration tests and
//! by the CLI's local dry-run mode. Keyed `(bucket, key)` in a
//! `DashMap`, following the same concurrent-map pattern git-internal's
//! pack cache and the wider pack's storage crates use for shared
//! in-process state.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use computor_core::error::ComputorError;
use dashmap::DashMap;

use crate::gateway::{HttpMethod, ObjectMetadata, ObjectStoreBackend, StoredObject};

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<(String, String), StoredObject>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStoreBackend for InMemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), ComputorError> {
        self.objects
            .insert((bucket.to_string(), key.to_string()), StoredObject { bytes, metadata });
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, ComputorError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ComputorError::NotFound(format!("{bucket}/{key}")))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ComputorError> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == bucket && entry.key().1.starts_with(prefix))
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    async fn copy_object(&self, bucket: &str, from: &str, to: &str) -> Result<(), ComputorError> {
        let value = self.get_object(bucket, from).await?;
        self.objects
            .insert((bucket.to_string(), to.to_string()), value);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ComputorError> {
        self.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: HttpMethod,
        ttl: Duration,
    ) -> Result<String, ComputorError> {
        let verb = match method {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
        };
        Ok(format!(
            "memory://{bucket}/{key}?method={verb}&ttl_secs={}",
            ttl.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ContentStoreGateway;

    #[tokio::test]
    async fn round_trips_through_gateway() {
        let gateway = ContentStoreGateway::new(InMemoryObjectStore::new(), "examples");
        gateway
            .put_object(
                "examples",
                "repositories/r/e/v1.0/main.py",
                Bytes::from_static(b"print('hi')"),
                ObjectMetadata::default(),
            )
            .await
            .unwrap();

        let obj = gateway
            .get_object("examples", "repositories/r/e/v1.0/main.py")
            .await
            .unwrap();
        assert_eq!(obj.bytes, Bytes::from_static(b"print('hi')"));
    }

    #[tokio::test]
    async fn rejects_disallowed_extension_before_reaching_backend() {
        let gateway = ContentStoreGateway::new(InMemoryObjectStore::new(), "examples");
        let result = gateway
            .put_object(
                "examples",
                "repositories/r/e/v1.0/run.exe",
                Bytes::from_static(b"MZ"),
                ObjectMetadata::default(),
            )
            .await;
        assert!(result.is_err());
    }
}
