//! Rendering of one input row into the output layout.

use crate::error::{TransformError, TransformResult};
use crate::hierarchy::HierarchyResolver;
use crate::transform::dimension::{DimensionKind, DimensionModel, FIXED_COLUMNS};
use csv::ByteRecord;
use std::str;
use tracing::warn;

/// Rewrites rows for one [`DimensionModel`], reusing a single output record.
///
/// Cells are copied byte for byte. A code missing from its hierarchy, a blank hierarchy id
/// in a hierarchical column, or an id or code that is not UTF-8 yields an empty value and a
/// warning. A hierarchy that cannot be fetched aborts.
pub struct RowTransformer {
    model: DimensionModel,
    output: ByteRecord,
    unresolved: usize,
}

impl RowTransformer {
    #[must_use]
    pub fn new(model: DimensionModel) -> Self {
        let output = ByteRecord::with_capacity(0, model.output_width());
        Self {
            model,
            output,
            unresolved: 0,
        }
    }

    #[must_use]
    pub const fn model(&self) -> &DimensionModel {
        &self.model
    }

    /// Cells left empty because their code could not be resolved.
    #[must_use]
    pub const fn unresolved(&self) -> usize {
        self.unresolved
    }

    /// Render `row` (read from `line`).
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MalformedRow`] if the row width differs from the model and
    /// [`TransformError::HierarchyFetch`] if a hierarchy cannot be fetched.
    pub fn render(
        &mut self,
        row: &ByteRecord,
        line: u64,
        resolver: &mut HierarchyResolver,
    ) -> TransformResult<&ByteRecord> {
        let expected = self.model.input_width();
        if row.len() != expected {
            return Err(TransformError::MalformedRow {
                line,
                expected,
                actual: row.len(),
            });
        }

        self.output.clear();
        for cell in row.iter().take(FIXED_COLUMNS) {
            self.output.push_field(cell);
        }

        for dimension in self.model.dimensions() {
            self.output.push_field(&dimension.name);
            let value = dimension.value(row);
            match &dimension.kind {
                DimensionKind::Plain => self.output.push_field(value),
                DimensionKind::Hierarchical { .. } => {
                    let hierarchy_id = dimension.hierarchy_id(row);
                    self.output.push_field(hierarchy_id);
                    self.output.push_field(value);
                    if !dimension.emits_resolved_value() {
                        continue;
                    }
                    if hierarchy_id.trim_ascii().is_empty() {
                        warn!(
                            dimension = %dimension.display_name(),
                            code = %String::from_utf8_lossy(value),
                            line,
                            "hierarchy id missing, leaving value empty"
                        );
                        self.unresolved += 1;
                        self.output.push_field(b"");
                        continue;
                    }
                    let (Ok(id), Ok(code)) = (str::from_utf8(hierarchy_id), str::from_utf8(value))
                    else {
                        warn!(
                            hierarchy_id = %String::from_utf8_lossy(hierarchy_id),
                            code = %String::from_utf8_lossy(value),
                            line,
                            "hierarchy id or code is not UTF-8, leaving value empty"
                        );
                        self.unresolved += 1;
                        self.output.push_field(b"");
                        continue;
                    };
                    match resolver.resolve_value(id, code) {
                        Ok(display) => self.output.push_field(display.as_bytes()),
                        Err(err) if !err.is_fatal() => {
                            warn!(
                                hierarchy_id = id,
                                code,
                                line,
                                row = ?row,
                                error = %err,
                                "unresolved hierarchy code, leaving value empty"
                            );
                            self.unresolved += 1;
                            self.output.push_field(b"");
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(&self.output)
    }
}
