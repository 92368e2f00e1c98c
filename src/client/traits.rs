//! Core traits for the object storage client capability.
//!
//! The bridge only needs four things from a storage client: an existence check, a fetch
//! that yields the content stream plus its metadata, an asynchronous upload submission,
//! and a blocking wait on the submitted transfer. Everything else (retries, multipart
//! chunking, credentials) stays on the client's side of this seam.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::io::Read;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for storage client operations
#[derive(Debug, Clone)]
pub struct ClientError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    RateLimited,
    InternalError,
    Other,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl Error for ClientError {}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

// ============================================================================
// Objects
// ============================================================================

/// Metadata the storage service keeps for a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteObjectMetadata {
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
}

/// A fetched object: its raw content stream and its metadata.
///
/// The content stream is whatever the transport hands out; callers should not assume
/// byte-at-a-time reads on it are cheap.
pub struct RemoteObject {
    pub content: Box<dyn Read + Send>,
    pub metadata: RemoteObjectMetadata,
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// A request to store `body` as `container/key`.
pub struct UploadRequest {
    pub container: String,
    pub key: String,
    pub body: Box<dyn Read + Send>,
    /// Size announced to the service up front.
    pub content_length: u64,
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("container", &self.container)
            .field("key", &self.key)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Unique identifier of one submitted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(pub u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer-{}", self.0)
    }
}

/// How a blocking wait on a transfer ended.
///
/// Interruption is an outcome, not an error: the waiter was told to stop waiting
/// before the transfer reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The transfer finished and the object was stored.
    Completed,
    /// The transfer ended with an error on the client's side.
    Failed(String),
    /// The wait was cut short by a cancellation signal.
    Interrupted,
}

/// Handle on one in-progress asynchronous upload
pub trait TransferHandle: Send + Sync {
    /// Returns the identifier used to key this transfer
    fn id(&self) -> TransferId;

    /// Blocks until the transfer completes, fails, or the wait is interrupted
    fn wait_for_completion(&self) -> WaitOutcome;
}

// ============================================================================
// ObjectClient - Object Storage
// ============================================================================

/// Trait for the object storage operations the bridge consumes
pub trait ObjectClient: Send + Sync {
    /// Check if an object exists
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unreachable, permissions are not enough, or the check fails
    fn object_exists(&self, container: &str, key: &str) -> ClientResult<bool>;

    /// Fetch an object's content stream together with its metadata
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, container: &str, key: &str) -> ClientResult<RemoteObject>;

    /// Start an asynchronous upload reading from the request body
    ///
    /// Returns as soon as the transfer has been accepted; the transfer itself runs
    /// independently and pulls from the body as bytes become available.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer cannot be scheduled
    fn submit_upload(&self, request: UploadRequest) -> ClientResult<Box<dyn TransferHandle>>;
}
