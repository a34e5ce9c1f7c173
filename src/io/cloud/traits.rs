//! Core traits for the storage and messaging collaborators.
//!
//! These traits provide synchronous interfaces; implementations backed by async SDKs are
//! expected to block internally.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io::{Cursor, Read};

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for storage and queue operations
#[derive(Debug, Clone)]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    AlreadyExists,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    InternalError,
    Other,
}

impl fmt::Display for CloudIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl Error for CloudIOError {}

impl CloudIOError {
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
}

impl From<std::io::Error> for CloudIOError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::Authorization,
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::InvalidInput | std::io::ErrorKind::InvalidData => {
                ErrorKind::InvalidInput
            }
            _ => ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// Metadata for an object in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    /// `Content-Encoding` the object was stored with (e.g. `"gzip"`).
    pub content_encoding: Option<String>,
    pub etag: Option<String>,
}

/// Trait for object storage operations
pub trait ObjectIO: Send + Sync {
    /// Upload data to object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket is not writable or the upload fails
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()>;

    /// Upload everything `body` yields, tagging the object with `content_encoding`.
    ///
    /// The object must not become visible unless `body` was read to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if reading `body` fails or the upload fails
    fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        content_encoding: Option<&str>,
    ) -> CloudResult<()>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// Open an object for streaming reads.
    ///
    /// The default implementation downloads the whole object first.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or cannot be opened
    fn get_object_reader(&self, bucket: &str, key: &str) -> CloudResult<Box<dyn Read + Send>> {
        let data = self.get_object(bucket, key)?;
        Ok(Box::new(Cursor::new(data)))
    }

    /// Delete an object
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the deletion fails
    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()>;

    /// Check if an object exists
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails
    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool>;

    /// Get object metadata without downloading content
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or the operation fails
    fn get_metadata(&self, bucket: &str, key: &str) -> CloudResult<ObjectMetadata>;
}

// ============================================================================
// QueueIO - Message Queues
// ============================================================================

/// A queue message
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String, // For acknowledgment
    pub body: String,
    pub attributes: HashMap<String, String>,
    pub receive_count: u32,
}

/// Trait for message queue operations
pub trait QueueIO: Send + Sync {
    /// Send a message to a queue
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is not writable or sending fails
    fn send(
        &self,
        queue: &str,
        body: &str,
        attributes: HashMap<String, String>,
    ) -> CloudResult<String>;

    /// Receive up to `max_messages` messages; they stay in flight until deleted
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist or receiving fails
    fn receive(&self, queue: &str, max_messages: u32) -> CloudResult<Vec<QueueMessage>>;

    /// Delete (acknowledge) a received message
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt handle is unknown or deletion fails
    fn delete(&self, queue: &str, receipt_handle: &str) -> CloudResult<()>;

    /// Get the number of messages waiting to be received
    ///
    /// # Errors
    ///
    /// Returns an error if the queue doesn't exist or the operation fails
    fn queue_size(&self, queue: &str) -> CloudResult<u64>;
}
