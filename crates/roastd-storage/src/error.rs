#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Remote host answered with a non-2xx status.
    #[error("Fetching {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Remote body exceeds the configured size limit.
    #[error("Fetching {url} exceeded the {limit} byte limit")]
    TooLarge { url: String, limit: usize },

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}
