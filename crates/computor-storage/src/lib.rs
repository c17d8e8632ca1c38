//! Content Store Gateway (CSG): a capability over a bucketed object
//! store, addressed by `repositories/{repository_id}/{example_id}/{version_tag}/…`
//! (§4.2), with an upload safety policy applied before anything
//! reaches the store.

pub mod addressing;
pub mod gateway;
pub mod object_store_backend;
pub mod safety;

#[cfg(any(test, feature = "memory-backend"))]
pub mod memory;

pub use gateway::{ContentStoreGateway, ObjectMetadata, ObjectStoreBackend, StoredObject};
pub use object_store_backend::S3Backend;
pub use safety::{UploadSafetyPolicy, UploadViolation};
