//! Dimension discovery from the first data row.
//!
//! Every row starts with three fixed columns (observation, data marking, observation type
//! value). The rest of the row is a sequence of `[hierarchy id, dimension name, value]`
//! triples, one per dimension. A dimension is hierarchical when its hierarchy-id cell is
//! non-blank.
//!
//! Cells are handled as raw bytes; only hierarchy ids and codes are decoded, when they
//! are looked up.

use crate::error::{TransformError, TransformResult};
use crate::hierarchy::{HierarchyResolver, TIME_HIERARCHY_TYPE};
use csv::ByteRecord;
use std::borrow::Cow;

/// Number of leading columns copied verbatim.
pub const FIXED_COLUMNS: usize = 3;

/// Columns per dimension group in the input.
pub const GROUP_WIDTH: usize = 3;

/// Output header of the fixed columns.
pub const FIXED_HEADERS: [&str; FIXED_COLUMNS] =
    ["Observation", "Data_Marking", "Observation_Type_Value"];

const HIERARCHY_ID_OFFSET: usize = 0;
const NAME_OFFSET: usize = 1;
const VALUE_OFFSET: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionKind {
    /// Emits `name, value`.
    Plain,
    /// Emits `name, hierarchy id, code` and, unless the hierarchy is a time hierarchy,
    /// the resolved display value.
    Hierarchical { hierarchy_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    /// Name cell of the sample row, without surrounding ASCII whitespace.
    pub name: Vec<u8>,
    /// 1-based position among the dimensions.
    pub ordinal: usize,
    /// Offset of the group's first column in the input row.
    pub column: usize,
    pub kind: DimensionKind,
}

impl Dimension {
    /// The name for log output.
    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self.kind, DimensionKind::Hierarchical { .. })
    }

    /// Whether a resolved value column is emitted.
    #[must_use]
    pub fn emits_resolved_value(&self) -> bool {
        match &self.kind {
            DimensionKind::Plain => false,
            DimensionKind::Hierarchical { hierarchy_type } => {
                hierarchy_type != TIME_HIERARCHY_TYPE
            }
        }
    }

    /// Number of output columns this dimension contributes.
    #[must_use]
    pub fn output_width(&self) -> usize {
        match (&self.kind, self.emits_resolved_value()) {
            (DimensionKind::Plain, _) => 2,
            (DimensionKind::Hierarchical { .. }, true) => 4,
            (DimensionKind::Hierarchical { .. }, false) => 3,
        }
    }

    /// Append this dimension's output header cells.
    pub fn push_headers(&self, header: &mut ByteRecord) {
        let n = self.ordinal;
        header.push_field(format!("Dimension_{n}_Name").as_bytes());
        match &self.kind {
            DimensionKind::Plain => header.push_field(format!("Dimension_{n}_Value").as_bytes()),
            DimensionKind::Hierarchical { .. } => {
                header.push_field(format!("Dimension_{n}_Hierarchy").as_bytes());
                header.push_field(format!("Dimension_{n}_Code").as_bytes());
                if self.emits_resolved_value() {
                    header.push_field(format!("Dimension_{n}_Value").as_bytes());
                }
            }
        }
    }

    /// Raw hierarchy-id cell of this dimension in `row`.
    #[must_use]
    pub fn hierarchy_id<'r>(&self, row: &'r ByteRecord) -> &'r [u8] {
        row.get(self.column + HIERARCHY_ID_OFFSET).unwrap_or_default()
    }

    /// Raw value (or code) cell of this dimension in `row`.
    #[must_use]
    pub fn value<'r>(&self, row: &'r ByteRecord) -> &'r [u8] {
        row.get(self.column + VALUE_OFFSET).unwrap_or_default()
    }
}

/// Ordered dimensions of one job, inferred once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionModel {
    dimensions: Vec<Dimension>,
}

impl DimensionModel {
    /// Infer the dimensions from `sample`, the first data row (at `line`).
    ///
    /// Each hierarchical dimension triggers one [`HierarchyResolver::fetch`] to learn the
    /// hierarchy type. A hierarchy id that is not UTF-8 is looked up in its lossy decoded
    /// form, which no hierarchy service knows, so the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MalformedRow`] if the sample is not three fixed columns
    /// followed by whole triples, and [`TransformError::HierarchyFetch`] if a hierarchy
    /// cannot be fetched.
    pub fn infer(
        sample: &ByteRecord,
        resolver: &mut HierarchyResolver,
        line: u64,
    ) -> TransformResult<Self> {
        let width = sample.len();
        let groups = width.saturating_sub(FIXED_COLUMNS).div_ceil(GROUP_WIDTH);
        let expected = FIXED_COLUMNS + groups * GROUP_WIDTH;
        if width != expected {
            return Err(TransformError::MalformedRow {
                line,
                expected,
                actual: width,
            });
        }

        let mut dimensions = Vec::with_capacity(groups);
        for (i, column) in (FIXED_COLUMNS..width).step_by(GROUP_WIDTH).enumerate() {
            let hierarchy_id = sample
                .get(column + HIERARCHY_ID_OFFSET)
                .unwrap_or_default()
                .trim_ascii();
            let kind = if hierarchy_id.is_empty() {
                DimensionKind::Plain
            } else {
                let hierarchy = resolver.fetch(&String::from_utf8_lossy(hierarchy_id))?;
                DimensionKind::Hierarchical {
                    hierarchy_type: hierarchy.kind.clone(),
                }
            };
            dimensions.push(Dimension {
                name: sample
                    .get(column + NAME_OFFSET)
                    .unwrap_or_default()
                    .trim_ascii()
                    .to_vec(),
                ordinal: i + 1,
                column,
                kind,
            });
        }
        Ok(Self { dimensions })
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Columns every input row must have.
    #[must_use]
    pub fn input_width(&self) -> usize {
        FIXED_COLUMNS + self.dimensions.len() * GROUP_WIDTH
    }

    /// Columns every output row has.
    #[must_use]
    pub fn output_width(&self) -> usize {
        FIXED_COLUMNS
            + self
                .dimensions
                .iter()
                .map(Dimension::output_width)
                .sum::<usize>()
    }

    /// The synthesized output header.
    #[must_use]
    pub fn header(&self) -> ByteRecord {
        let mut header = ByteRecord::with_capacity(0, self.output_width());
        for fixed in FIXED_HEADERS {
            header.push_field(fixed.as_bytes());
        }
        for dimension in &self.dimensions {
            dimension.push_headers(&mut header);
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{FakeHierarchySource, Hierarchy};
    use std::sync::Arc;

    fn resolver() -> (Arc<FakeHierarchySource>, HierarchyResolver) {
        let source = Arc::new(
            FakeHierarchySource::new()
                .with_hierarchy(Hierarchy {
                    id: "geo".into(),
                    kind: "geography".into(),
                    ..Hierarchy::default()
                })
                .with_hierarchy(Hierarchy {
                    id: "year".into(),
                    kind: "time".into(),
                    ..Hierarchy::default()
                })
                .with_failing("down"),
        );
        (source.clone(), HierarchyResolver::new(source))
    }

    #[test]
    fn infers_plain_and_hierarchical_dimensions() -> anyhow::Result<()> {
        let (source, mut resolver) = resolver();
        let sample = ByteRecord::from(vec![
            "10", "", "count", " geo ", " Geography ", "E92000001", "", "Sex", "Male", "year",
            "Time", "2016", "geo", "Region", "E12000001",
        ]);
        let model = DimensionModel::infer(&sample, &mut resolver, 2)?;

        let dims = model.dimensions();
        assert_eq!(dims.len(), 4);
        assert_eq!(dims[0].name, b"Geography");
        assert_eq!(dims[0].display_name(), "Geography");
        assert_eq!(dims[0].column, 3);
        assert!(dims[0].is_hierarchical());
        assert_eq!(dims[1].kind, DimensionKind::Plain);
        assert_eq!(dims[1].ordinal, 2);
        assert!(!dims[2].emits_resolved_value());
        assert_eq!(dims[3].column, 12);

        assert_eq!(model.input_width(), 15);
        assert_eq!(model.output_width(), 3 + 4 + 2 + 3 + 4);
        assert_eq!(
            model
                .header()
                .iter()
                .map(String::from_utf8_lossy)
                .collect::<Vec<_>>(),
            vec![
                "Observation",
                "Data_Marking",
                "Observation_Type_Value",
                "Dimension_1_Name",
                "Dimension_1_Hierarchy",
                "Dimension_1_Code",
                "Dimension_1_Value",
                "Dimension_2_Name",
                "Dimension_2_Value",
                "Dimension_3_Name",
                "Dimension_3_Hierarchy",
                "Dimension_3_Code",
                "Dimension_4_Name",
                "Dimension_4_Hierarchy",
                "Dimension_4_Code",
                "Dimension_4_Value",
            ]
        );
        // "geo" is used twice but fetched once
        assert_eq!(source.fetch_count("geo"), 1);
        Ok(())
    }

    #[test]
    fn fixed_columns_only_yield_no_dimensions() -> anyhow::Result<()> {
        let (_, mut resolver) = resolver();
        let sample = ByteRecord::from(vec!["1", "", "x"]);
        let model = DimensionModel::infer(&sample, &mut resolver, 2)?;
        assert!(model.dimensions().is_empty());
        assert_eq!(model.header().len(), 3);
        Ok(())
    }

    #[test]
    fn partial_groups_are_malformed() {
        let (_, mut resolver) = resolver();
        let sample = ByteRecord::from(vec!["1", "", "x", "", "Sex"]);
        let err = DimensionModel::infer(&sample, &mut resolver, 2).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MalformedRow {
                line: 2,
                expected: 6,
                actual: 5
            }
        ));

        let err =
            DimensionModel::infer(&ByteRecord::from(vec!["1"]), &mut resolver, 2).unwrap_err();
        assert!(matches!(err, TransformError::MalformedRow { expected: 3, .. }));
    }

    #[test]
    fn hierarchy_outage_aborts_inference() {
        let (_, mut resolver) = resolver();
        let sample = ByteRecord::from(vec!["1", "", "x", "down", "Geography", "E92000001"]);
        let err = DimensionModel::infer(&sample, &mut resolver, 2).unwrap_err();
        assert!(matches!(
            err,
            TransformError::HierarchyFetch { ref hierarchy_id, .. } if hierarchy_id == "down"
        ));
    }

    #[test]
    fn names_keep_their_bytes() -> anyhow::Result<()> {
        let (_, mut resolver) = resolver();
        let cells: Vec<&[u8]> = vec![b"1", b"", b"x", b"", b" Pr\xA3ce ", b"10"];
        let sample = ByteRecord::from(cells);
        let model = DimensionModel::infer(&sample, &mut resolver, 2)?;
        assert_eq!(model.dimensions()[0].name, b"Pr\xA3ce");
        assert_eq!(model.dimensions()[0].display_name(), "Pr\u{FFFD}ce");
        Ok(())
    }
}
