//! The CSG capability trait and the gateway that enforces the upload
//! safety policy in front of it. `ObjectStoreBackend` is implemented
//! once per real store (S3/MinIO via the `object_store` crate) and
//! once in-memory for tests (see [`crate::memory`]).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use computor_core::error::ComputorError;

use crate::safety::UploadSafetyPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub user_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub metadata: ObjectMetadata,
}

/// The raw object-store capability (§4.2). No safety checks here —
/// those live in [`ContentStoreGateway`], which every caller outside
/// this crate is expected to go through instead of a backend directly.
#[async_trait]
pub trait ObjectStoreBackend: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), ComputorError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, ComputorError>;

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ComputorError>;

    async fn copy_object(&self, bucket: &str, from: &str, to: &str) -> Result<(), ComputorError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ComputorError>;

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: HttpMethod,
        ttl: Duration,
    ) -> Result<String, ComputorError>;
}

/// The capability surface the rest of the orchestrator depends on.
/// Wraps any [`ObjectStoreBackend`] with the upload whitelist from §4.2
/// applied on every `put_object` call.
pub struct ContentStoreGateway<B: ObjectStoreBackend> {
    backend: B,
    policy: UploadSafetyPolicy,
    default_bucket: String,
}

impl<B: ObjectStoreBackend> ContentStoreGateway<B> {
    pub fn new(backend: B, default_bucket: impl Into<String>) -> Self {
        Self {
            backend,
            policy: UploadSafetyPolicy::default(),
            default_bucket: default_bucket.into(),
        }
    }

    pub fn with_policy(mut self, policy: UploadSafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), ComputorError> {
        let filename = key.rsplit('/').next().unwrap_or(key);
        self.policy
            .check(filename, bytes.len() as u64)
            .map_err(|e| ComputorError::Validation(e.to_string()))?;
        self.backend.put_object(bucket, key, bytes, metadata).await
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, ComputorError> {
        self.backend.get_object(bucket, key).await
    }

    pub async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ComputorError> {
        self.backend.list_objects(bucket, prefix).await
    }

    pub async fn copy_object(&self, bucket: &str, from: &str, to: &str) -> Result<(), ComputorError> {
        self.backend.copy_object(bucket, from, to).await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ComputorError> {
        self.backend.delete_object(bucket, key).await
    }

    pub async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: HttpMethod,
        ttl: Duration,
    ) -> Result<String, ComputorError> {
        self.backend.presigned_url(bucket, key, method, ttl).await
    }
}
