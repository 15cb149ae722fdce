use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{ObjectStore, StorageError};

/// Disk-backed object store.
///
/// Each object is a flat file at `{dir}/{name}` and is published at
/// `{public_base}/storage/{name}`. URLs under that prefix are read straight
/// from disk; any other URL is fetched over HTTP, up to `max_fetch_bytes`.
pub struct DiskStore {
    dir: PathBuf,
    public_base: String,
    http: reqwest::Client,
    max_fetch_bytes: usize,
}

impl DiskStore {
    pub async fn new(
        dir: PathBuf,
        public_base: &str,
        fetch_timeout: Duration,
        max_fetch_bytes: usize,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());

        let http = reqwest::Client::builder().timeout(fetch_timeout).build()?;

        Ok(Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
            http,
            max_fetch_bytes,
        })
    }

    /// Public URL of a stored object.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/storage/{}", self.public_base, name)
    }

    /// Read a stored object by name.
    pub async fn read(&self, name: &str) -> Result<Bytes, StorageError> {
        let path = self.dir.join(validate_name(name)?);
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn local_name<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base.as_str())
            .and_then(|rest| rest.strip_prefix("/storage/"))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Bytes, StorageError> {
        let mut response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || StorageError::TooLarge {
            url: url.to_string(),
            limit: self.max_fetch_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_fetch_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_fetch_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait]
impl ObjectStore for DiskStore {
    async fn put(&self, data: Bytes, name: &str, content_type: &str) -> Result<String, StorageError> {
        let path = self.dir.join(validate_name(name)?);

        // create_new: never overwrite an existing object
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!("Stored {} ({} bytes, {})", name, data.len(), content_type);
        Ok(self.url_for(name))
    }

    async fn get(&self, url: &str) -> Result<Bytes, StorageError> {
        match self.local_name(url) {
            Some(name) => self.read(name).await,
            None => {
                debug!("Fetching remote object {}", url);
                self.fetch_remote(url).await.inspect_err(|e| {
                    warn!("Remote fetch of {} failed: {}", url, e);
                })
            }
        }
    }
}

/// Reject names that could escape the storage directory.
fn validate_name(name: &str) -> Result<&str, StorageError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn store(dir: &tempfile::TempDir) -> DiskStore {
        DiskStore::new(dir.path().to_path_buf(), "http://localhost:3000/", Duration::from_secs(5), 1024)
            .await
            .unwrap()
    }

    /// Answer a single HTTP request with `response` and return the URL.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/photo.jpg", addr)
    }

    fn with_length(body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    fn chunked(body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response.extend_from_slice(b"\r\n0\r\n\r\n");
        response
    }

    #[tokio::test]
    async fn test_fetches_remote_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let url = serve_once(with_length(b"remote jpeg")).await;
        assert_eq!(&store.get(&url).await.unwrap()[..], b"remote jpeg");
    }

    #[tokio::test]
    async fn test_oversized_remote_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let big = vec![0xffu8; 4096];

        let url = serve_once(with_length(&big)).await;
        let err = store.get(&url).await;
        assert!(matches!(err, Err(StorageError::TooLarge { limit: 1024, .. })));

        // No Content-Length: the cap is enforced while streaming
        let url = serve_once(chunked(&big)).await;
        let err = store.get(&url).await;
        assert!(matches!(err, Err(StorageError::TooLarge { limit: 1024, .. })));
    }

    #[tokio::test]
    async fn test_put_then_get_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let url = store
            .put(Bytes::from_static(b"jpeg bytes"), "roast_1.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/storage/roast_1.jpg");

        let data = store.get(&url).await.unwrap();
        assert_eq!(&data[..], b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_put_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store.put(Bytes::from_static(b"a"), "x.jpg", "image/jpeg").await.unwrap();
        let err = store.put(Bytes::from_static(b"b"), "x.jpg", "image/jpeg").await;
        assert!(matches!(err, Err(StorageError::Io(_))));
        assert_eq!(&store.read("x.jpg").await.unwrap()[..], b"a");
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        for name in ["../etc/passwd", "a/b.jpg", "", ".."] {
            let err = store.put(Bytes::from_static(b"x"), name, "image/jpeg").await;
            assert!(matches!(err, Err(StorageError::InvalidName(_))), "{name}");
        }
    }

    #[tokio::test]
    async fn test_missing_local_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let err = store.get("http://localhost:3000/storage/missing.jpg").await;
        assert!(matches!(err, Err(StorageError::NotFound(_))));
    }
}
