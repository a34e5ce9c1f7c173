//! The denormalizing transformation.
//!
//! - [`dimension`]: dimension discovery and header synthesis
//! - [`row`]: per-row rendering with hierarchy resolution
//! - [`pipeline`]: the streaming driver and the [`CsvTransform`] seam

pub mod dimension;
pub mod pipeline;
pub mod row;

pub use dimension::{Dimension, DimensionKind, DimensionModel};
pub use pipeline::{CsvTransform, TransformSummary, Transformer};
pub use row::RowTransformer;
