//! # csv-transformer
//!
//! Denormalizes dimension CSV files. Each job reads a source CSV object, expands every
//! hierarchical dimension column into its hierarchy id, code and resolved display value
//! (looked up in an external hierarchy service), and streams the rewritten CSV to a
//! destination object, optionally gzip-compressed on the fly.
//!
//! ## Input layout
//!
//! Every row starts with three fixed columns (observation, data marking, observation type
//! value), followed by one `[hierarchy id, dimension name, value]` triple per dimension.
//! A dimension whose hierarchy-id cell is blank is a plain dimension.
//!
//! ```text
//! Obs,Mark,Type,HID,DimName,Code
//! 10,ok,count,E92000001,Geography,E92000001
//! ```
//!
//! becomes
//!
//! ```text
//! Observation,Data_Marking,Observation_Type_Value,Dimension_1_Name,Dimension_1_Hierarchy,Dimension_1_Code,Dimension_1_Value
//! 10,ok,count,Geography,E92000001,E92000001,England
//! ```
//!
//! Dimensions backed by a `"time"` hierarchy have no `_Value` column.
//!
//! ## Quick Start
//!
//! ```
//! use csv_transformer::hierarchy::HierarchyResolver;
//! use csv_transformer::testing::{ROUND_TRIP_INPUT, sample_hierarchies};
//! use csv_transformer::transform::{CsvTransform, Transformer};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut resolver = HierarchyResolver::new(Arc::new(sample_hierarchies()));
//! let mut output = Vec::new();
//! let summary = Transformer::new().transform(
//!     &mut ROUND_TRIP_INPUT.as_bytes(),
//!     &mut output,
//!     &mut resolver,
//!     "example",
//! )?;
//! assert_eq!(summary.rows, 1);
//! assert!(String::from_utf8(output)?.ends_with("10,ok,count,Geography,E92000001,E92000001,England\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error policy
//!
//! A code missing from its hierarchy is recovered per row: the value cell stays empty and a
//! warning is logged. Everything else (an unreachable hierarchy service, a malformed row, a
//! storage failure, a panic) aborts the job with a [`TransformError`] and no output object
//! is stored.
//!
//! ## Module Overview
//!
//! - [`transform`] - Dimension model, row rendering and the streaming pipeline
//! - [`hierarchy`] - Hierarchy model, per-job resolver and hierarchy sources
//! - [`io`] - Storage and queue collaborators, byte pipe and compressing sink
//! - [`handler`] - The job boundary ([`JobHandler`])
//! - [`consumer`] - Dispatch loop over job descriptions
//! - [`config`] - Environment configuration
//! - [`testing`] - Fixtures and helpers for tests
//!
//! ## Feature Flags
//!
//! - `compression-gzip` (default): gzip output via `flate2`
//! - `http-hierarchy` (default): [`HttpHierarchySource`](hierarchy::HttpHierarchySource)
//!   via blocking `reqwest`, required by the binary

pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod hierarchy;
pub mod io;
pub mod request;
pub mod testing;
pub mod transform;

pub use config::Config;
pub use error::{ConfigError, TransformError, TransformResult};
pub use handler::{JobHandler, TransformResponse};
pub use hierarchy::{Hierarchy, HierarchyResolver, HierarchySource};
pub use io::compression::{CompressingSink, OutputEncoding};
pub use request::TransformRequest;
pub use transform::{CsvTransform, DimensionModel, TransformSummary, Transformer};
