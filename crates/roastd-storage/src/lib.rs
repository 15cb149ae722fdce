//! Object storage for roast photos.
//!
//! The workflow only needs two capabilities from storage: put bytes under a
//! name and get back a public URL, and fetch the bytes behind a URL. Both
//! live behind [`ObjectStore`] so the orchestrator can be driven by stubs.

pub mod disk;
pub mod error;

use async_trait::async_trait;
use bytes::Bytes;

pub use disk::DiskStore;
pub use error::StorageError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `name` and return the URL clients use to read it.
    async fn put(&self, data: Bytes, name: &str, content_type: &str) -> Result<String, StorageError>;

    /// Fetch the bytes behind `url`.
    async fn get(&self, url: &str) -> Result<Bytes, StorageError>;
}

/// Content type for a stored object, derived from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// File extension to use when storing an image of the given MIME type.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}
