//! Object locators of the form `scheme://bucket/path/to/key`.

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A parsed storage locator identifying a bucket and an object key.
///
/// Serializes as its string form, so it can sit directly in JSON job descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectUrl {
    scheme: String,
    bucket: String,
    key: String,
}

impl ObjectUrl {
    /// Parse a locator such as `s3://bucket/dir/file.csv`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error when the scheme separator is missing, the bucket name
    /// is invalid, or the key is empty.
    pub fn parse(url: &str) -> CloudResult<Self> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(invalid(url, "missing scheme separator"));
        };
        if scheme.is_empty() {
            return Err(invalid(url, "missing scheme"));
        }
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        validate_bucket(bucket).map_err(|reason| invalid(url, reason))?;
        validate_key(key).map_err(|reason| invalid(url, reason))?;
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object path within the bucket.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Extension of the key's final segment, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.key).extension().and_then(|e| e.to_str())
    }
}

/// Check a bucket name: non-empty, at most 255 characters of `[A-Za-z0-9._-]`.
pub(crate) fn validate_bucket(bucket: &str) -> Result<(), &'static str> {
    if bucket.is_empty() {
        return Err("missing bucket");
    }
    if bucket.len() > 255 {
        return Err("bucket name longer than 255 characters");
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("bucket name has invalid characters");
    }
    Ok(())
}

/// Check an object key: non-empty, relative, without `..` or empty segments.
pub(crate) fn validate_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("missing key");
    }
    if key.starts_with('/') {
        return Err("key must be relative");
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err("key has an empty or '..' segment");
    }
    Ok(())
}

fn invalid(url: &str, reason: &str) -> CloudIOError {
    CloudIOError::new(
        ErrorKind::InvalidInput,
        format!("Invalid object locator {url:?}: {reason}"),
    )
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl FromStr for ObjectUrl {
    type Err = CloudIOError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectUrl {
    type Error = CloudIOError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectUrl> for String {
    fn from(url: ObjectUrl) -> Self {
        url.to_string()
    }
}
