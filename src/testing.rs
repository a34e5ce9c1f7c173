//! Test fixtures and helpers for transform jobs.
//!
//! - **Fixtures**: the round-trip sample, a multi-dimension sample with a time
//!   hierarchy, and a [`FakeHierarchySource`](crate::hierarchy::FakeHierarchySource)
//!   preloaded with matching hierarchies ([`sample_hierarchies`])
//! - **Assertions**: parse output into rows ([`csv_rows`]), decode stored objects
//!   ([`decode_content`]) and check row shapes
//! - **Harness**: [`TestJob`] wires a [`JobHandler`] to in-memory collaborators
//!
//! # Quick Start
//!
//! ```
//! use csv_transformer::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let job = TestJob::new()?;
//! job.put_input("in", "data.csv", ROUND_TRIP_INPUT)?;
//! let response = job.run("s3://in/data.csv", "s3://out/data.csv")?;
//! assert!(response.is_success());
//!
//! let rows = csv_rows(&job.output("out", "data.csv")?)?;
//! assert_row_eq(&rows[1], &ROUND_TRIP_ROW);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

use crate::config::Config;
use crate::handler::{JobHandler, TransformResponse};
use crate::hierarchy::FakeHierarchySource;
use crate::io::cloud::{FakeObjectIO, ObjectIO};
use crate::request::TransformRequest;
use crate::transform::Transformer;
use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

/// A [`JobHandler`] over [`FakeObjectIO`] and [`sample_hierarchies`], staging temporary
/// files in a private directory.
pub struct TestJob {
    pub storage: FakeObjectIO,
    pub hierarchies: FakeHierarchySource,
    pub handler: JobHandler,
    temp_dir: TempDir,
}

impl TestJob {
    /// A job with uncompressed output.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_config(|_| {})
    }

    /// A job whose [`Config`] is adjusted by `configure`. The temporary directory is
    /// always the job's own.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn with_config(configure: impl FnOnce(&mut Config)) -> Result<Self> {
        Self::with_hierarchies(sample_hierarchies(), configure)
    }

    /// Like [`with_config`](Self::with_config) with a custom hierarchy source.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn with_hierarchies(
        hierarchies: FakeHierarchySource,
        configure: impl FnOnce(&mut Config),
    ) -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let mut config = Config::default();
        configure(&mut config);
        config.temp_dir = temp_dir.path().to_path_buf();

        let storage = FakeObjectIO::new();
        let handler = JobHandler::new(
            config,
            Arc::new(storage.clone()),
            Arc::new(hierarchies.clone()),
            Arc::new(Transformer::new()),
        );
        Ok(Self {
            storage,
            hierarchies,
            handler,
            temp_dir,
        })
    }

    /// Store `contents` as a source object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be stored.
    pub fn put_input(&self, bucket: &str, key: &str, contents: &str) -> Result<()> {
        self.storage.put_object(bucket, key, contents.as_bytes())?;
        Ok(())
    }

    /// Run a job between two locators.
    ///
    /// # Errors
    ///
    /// Returns an error if a locator is malformed.
    pub fn run(&self, input_url: &str, output_url: &str) -> Result<TransformResponse> {
        let request = TransformRequest::new(input_url, output_url, "test-request")?;
        Ok(self.handler.handle(&request))
    }

    /// The stored output object, decoded according to its content-encoding marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is missing or cannot be decoded.
    pub fn output(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let meta = self.storage.get_metadata(bucket, key)?;
        let raw = self.storage.get_object(bucket, key)?;
        Ok(decode_content(&raw, meta.content_encoding.as_deref())?)
    }

    /// Files left behind in the temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn leftover_temp_files(&self) -> Result<usize> {
        Ok(std::fs::read_dir(self.temp_dir.path())?.count())
    }
}
