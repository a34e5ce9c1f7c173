//! Error types for transform jobs and configuration.
//!
//! A job fails with exactly one [`TransformError`]. Every variant except
//! [`TransformError::HierarchyCodeNotFound`] is fatal to the job that raised it; an
//! unknown code is recovered per row by the row transformer and only surfaces here when a
//! caller asks the resolver directly.

use crate::io::cloud::CloudIOError;
use std::any::Any;
use std::io;
use thiserror::Error;

/// Boxed error used at collaborator seams (hierarchy sources, encoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

#[derive(Debug, Error)]
pub enum TransformError {
    /// The source object is not a `.csv` file. Raised before any I/O.
    #[error("Unsupported file type. Please specify a filePath for a .csv file.")]
    UnsupportedInput { extension: String },

    /// The job description could not be decoded or names an invalid locator.
    #[error("invalid transform request: {0}")]
    InvalidRequest(String),

    /// The storage read of the source object failed.
    #[error("failed to fetch source {locator}: {source}")]
    SourceFetch {
        locator: String,
        #[source]
        source: CloudIOError,
    },

    /// The source has no header line at all.
    #[error("unable to read header row: input is empty")]
    MissingHeader,

    /// A record could not be read from the source stream.
    #[error("unable to read row {line}: {source}")]
    SourceRead {
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// The hierarchy service is unreachable or returned an unusable payload.
    #[error("failed to fetch hierarchy {hierarchy_id}: {source}")]
    HierarchyFetch {
        hierarchy_id: String,
        #[source]
        source: BoxError,
    },

    /// The hierarchy was fetched but does not contain the code.
    #[error("no entry found with code {code} in hierarchy {hierarchy_id}")]
    HierarchyCodeNotFound { hierarchy_id: String, code: String },

    /// A row does not have the column layout of the dimension model.
    #[error("row {line} has {actual} columns, expected {expected}")]
    MalformedRow {
        line: u64,
        expected: usize,
        actual: usize,
    },

    /// Writing the transformed output (or compressing it) failed.
    #[error("failed to write output: {0}")]
    SinkWrite(#[source] io::Error),

    /// Storing the finished output failed.
    #[error("failed to upload output to {locator}: {source}")]
    SinkUpload {
        locator: String,
        #[source]
        source: CloudIOError,
    },

    /// An unexpected fault (panic) caught at the job boundary.
    #[error("{0}")]
    InternalFault(String),
}

impl TransformError {
    /// Whether the error aborts the whole job.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::HierarchyCodeNotFound { .. })
    }

    pub(crate) fn hierarchy_fetch(hierarchy_id: &str, source: impl Into<BoxError>) -> Self {
        Self::HierarchyFetch {
            hierarchy_id: hierarchy_id.to_string(),
            source: source.into(),
        }
    }

    /// Map a CSV writer error into a sink error, keeping the I/O cause when there is one.
    pub(crate) fn from_csv_write(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return Self::SinkWrite(io::Error::other(err));
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io_err) => Self::SinkWrite(io_err),
            other => Self::SinkWrite(io::Error::other(format!("{other:?}"))),
        }
    }
}

/// Extract a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Errors raised while loading [`Config`](crate::config::Config).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{key} must contain the {placeholder} placeholder, got {value:?}")]
    MissingPlaceholder {
        key: String,
        value: String,
        placeholder: String,
    },
}
