//! The job boundary: fetch, transform, compress, upload.
//!
//! [`JobHandler::execute`] runs one [`TransformRequest`] to completion and returns a typed
//! result; a panic anywhere inside the job becomes [`TransformError::InternalFault`]. The
//! transformed output is staged in a temporary file that is removed on every path.
//! [`JobHandler::handle`] turns the result into the [`TransformResponse`] reported to the
//! caller.

use crate::config::Config;
use crate::error::{TransformError, TransformResult, panic_message};
use crate::hierarchy::{HierarchyResolver, HierarchySource};
use crate::io::cloud::ObjectIO;
use crate::io::compression::CompressingSink;
use crate::request::TransformRequest;
use crate::transform::{CsvTransform, TransformSummary};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Response message of a job that completed.
pub const SUCCESS_MESSAGE: &str = "Your request is being processed.";

/// Extension (without the dot) a source object must have.
pub const CSV_EXTENSION: &str = "csv";

const TEMP_FILE_PREFIX: &str = "csv_transformer_";

/// Outcome of a job as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl TransformResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message == SUCCESS_MESSAGE
    }
}

impl From<&TransformError> for TransformResponse {
    fn from(err: &TransformError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Runs transform jobs against injected collaborators.
pub struct JobHandler {
    config: Config,
    storage: Arc<dyn ObjectIO>,
    hierarchies: Arc<dyn HierarchySource>,
    transformer: Arc<dyn CsvTransform>,
}

impl JobHandler {
    #[must_use]
    pub fn new(
        config: Config,
        storage: Arc<dyn ObjectIO>,
        hierarchies: Arc<dyn HierarchySource>,
        transformer: Arc<dyn CsvTransform>,
    ) -> Self {
        Self {
            config,
            storage,
            hierarchies,
            transformer,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run one job.
    ///
    /// # Errors
    ///
    /// Returns the job's terminal [`TransformError`]; panics are reported as
    /// [`TransformError::InternalFault`].
    pub fn execute(&self, request: &TransformRequest) -> TransformResult<TransformSummary> {
        let span = info_span!(
            "job",
            request_id = %request.request_id,
            input = %request.input_url,
            output = %request.output_url
        );
        let _guard = span.enter();
        info!("job received");
        let started = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(request)))
            .unwrap_or_else(|payload| {
                Err(TransformError::InternalFault(panic_message(payload.as_ref())))
            });

        match &result {
            Ok(summary) => info!(
                rows = summary.rows,
                unresolved = summary.unresolved,
                header_only = summary.header_only,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job finished"
            ),
            Err(err) => error!(error = %err, "job failed"),
        }
        result
    }

    /// Run one job and report the outcome as a response message.
    #[must_use]
    pub fn handle(&self, request: &TransformRequest) -> TransformResponse {
        match self.execute(request) {
            Ok(_) => TransformResponse::success(),
            Err(err) => TransformResponse::from(&err),
        }
    }

    fn run(&self, request: &TransformRequest) -> TransformResult<TransformSummary> {
        let input = &request.input_url;
        let output = &request.output_url;
        if input.extension() != Some(CSV_EXTENSION) {
            return Err(TransformError::UnsupportedInput {
                extension: input.extension().unwrap_or_default().to_string(),
            });
        }

        let mut source = self
            .storage
            .get_object_reader(input.bucket(), input.key())
            .map_err(|source| TransformError::SourceFetch {
                locator: input.to_string(),
                source,
            })?;

        // Removed when dropped, which also happens while unwinding.
        let staged = tempfile::Builder::new()
            .prefix(&temp_file_prefix(&request.request_id))
            .suffix(".csv")
            .tempfile_in(&self.config.temp_dir)
            .map_err(TransformError::SinkWrite)?;
        let file = staged.reopen().map_err(TransformError::SinkWrite)?;

        let encoding = self.config.output_encoding();
        let mut sink = CompressingSink::new(BufWriter::new(file), encoding)
            .map_err(TransformError::SinkWrite)?;
        let mut resolver = HierarchyResolver::new(Arc::clone(&self.hierarchies));

        let summary = match self.transformer.transform(
            &mut source,
            &mut sink,
            &mut resolver,
            &request.request_id,
        ) {
            Ok(summary) => summary,
            Err(err) => {
                sink.abort(&err.to_string());
                return Err(err);
            }
        };
        sink.finish().map_err(TransformError::SinkWrite)?;

        let upload_started = Instant::now();
        let mut body = BufReader::new(staged.reopen().map_err(TransformError::SinkWrite)?);
        self.storage
            .put_object_stream(
                output.bucket(),
                output.key(),
                &mut body,
                encoding.content_encoding(),
            )
            .map_err(|source| TransformError::SinkUpload {
                locator: output.to_string(),
                source,
            })?;
        info!(
            destination = %output,
            encoding = encoding.content_encoding().unwrap_or("identity"),
            elapsed_ms = upload_started.elapsed().as_millis() as u64,
            "upload finished"
        );
        Ok(summary)
    }
}

/// Temp file prefix carrying the correlation id, reduced to filename-safe characters.
fn temp_file_prefix(request_id: &str) -> String {
    let id: String = request_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{TEMP_FILE_PREFIX}{id}_")
}
