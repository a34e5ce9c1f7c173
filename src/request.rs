//! Inbound job descriptions.

use crate::error::{TransformError, TransformResult};
use crate::io::cloud::ObjectUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One transform job: where to read, where to write, and a correlation id.
///
/// ```
/// use csv_transformer::request::TransformRequest;
///
/// let request = TransformRequest::from_json(
///     br#"{"inputUrl":"s3://in/data.csv","outputUrl":"s3://out/data.csv","requestId":"42"}"#,
/// ).unwrap();
/// assert_eq!(request.input_url.key(), "data.csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub input_url: ObjectUrl,
    pub output_url: ObjectUrl,
    #[serde(default)]
    pub request_id: String,
}

impl TransformRequest {
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidRequest`] if either locator is malformed.
    pub fn new(
        input_url: &str,
        output_url: &str,
        request_id: impl Into<String>,
    ) -> TransformResult<Self> {
        let input_url = ObjectUrl::parse(input_url)
            .map_err(|e| TransformError::InvalidRequest(format!("inputUrl: {e}")))?;
        let output_url = ObjectUrl::parse(output_url)
            .map_err(|e| TransformError::InvalidRequest(format!("outputUrl: {e}")))?;
        Ok(Self {
            input_url,
            output_url,
            request_id: request_id.into(),
        })
    }

    /// Decode a JSON job description.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidRequest`] if the payload is not a valid description.
    pub fn from_json(payload: &[u8]) -> TransformResult<Self> {
        serde_json::from_slice(payload).map_err(|e| TransformError::InvalidRequest(e.to_string()))
    }

    /// Assign a random correlation id if the request has none.
    pub fn ensure_request_id(&mut self) -> &str {
        if self.request_id.trim().is_empty() {
            self.request_id = Uuid::new_v4().to_string();
        }
        &self.request_id
    }
}

impl fmt::Display for TransformRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request {} ({} -> {})",
            self.request_id, self.input_url, self.output_url
        )
    }
}
