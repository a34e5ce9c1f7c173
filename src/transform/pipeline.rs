//! Streaming CSV transformation.
//!
//! [`Transformer`] reads the source strictly row by row:
//!
//! 1. read and discard the original header (an empty source is fatal);
//! 2. read the first data row; if there is none, write the original header back and stop;
//! 3. infer the [`DimensionModel`] from that row and write the synthesized header;
//! 4. render and write every row, in input order, until end of input.
//!
//! Records are read and written as raw bytes, so cells that are not UTF-8 pass through
//! unchanged. Any error ends the transformation at once. Whatever was written to the output
//! up to that point is incomplete, and the caller is expected to discard it.

use crate::error::{TransformError, TransformResult};
use crate::hierarchy::HierarchyResolver;
use crate::transform::dimension::DimensionModel;
use crate::transform::row::RowTransformer;
use csv::{ByteRecord, Reader};
use std::io::{Read, Write};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// What a finished transformation produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Data rows written (the header is not counted).
    pub rows: u64,
    /// Cells left empty because a code did not resolve.
    pub unresolved: usize,
    /// The source had a header and no data rows.
    pub header_only: bool,
}

/// A CSV-to-CSV transformation run against a per-job resolver.
pub trait CsvTransform: Send + Sync {
    /// Transform `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`TransformError`] encountered.
    fn transform(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        resolver: &mut HierarchyResolver,
        request_id: &str,
    ) -> TransformResult<TransformSummary>;
}

/// The denormalizing transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Read the next record into `record`; `false` at end of input.
fn next_record<R: Read>(
    reader: &mut Reader<R>,
    record: &mut ByteRecord,
    line: u64,
) -> TransformResult<bool> {
    reader
        .read_byte_record(record)
        .map_err(|source| TransformError::SourceRead { line, source })
}

impl CsvTransform for Transformer {
    fn transform(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        resolver: &mut HierarchyResolver,
        request_id: &str,
    ) -> TransformResult<TransformSummary> {
        let _span = info_span!("transform", request_id).entered();
        let started = Instant::now();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);
        let mut writer = csv::WriterBuilder::new().from_writer(output);

        let mut header = ByteRecord::new();
        if !next_record(&mut reader, &mut header, 1)? {
            return Err(TransformError::MissingHeader);
        }

        let mut line = 2;
        let mut record = ByteRecord::new();
        if !next_record(&mut reader, &mut record, line)? {
            writer
                .write_byte_record(&header)
                .map_err(TransformError::from_csv_write)?;
            writer.flush().map_err(TransformError::SinkWrite)?;
            info!("source has no data rows, header written back unchanged");
            return Ok(TransformSummary {
                rows: 0,
                unresolved: 0,
                header_only: true,
            });
        }

        let model = DimensionModel::infer(&record, resolver, line)?;
        debug!(
            dimensions = model.dimensions().len(),
            output_columns = model.output_width(),
            "dimension model inferred"
        );
        writer
            .write_byte_record(&model.header())
            .map_err(TransformError::from_csv_write)?;

        let mut rows = RowTransformer::new(model);
        let mut written = 0u64;
        loop {
            let rendered = rows.render(&record, line, resolver)?;
            writer
                .write_byte_record(rendered)
                .map_err(TransformError::from_csv_write)?;
            written += 1;
            line += 1;
            if !next_record(&mut reader, &mut record, line)? {
                break;
            }
        }
        writer.flush().map_err(TransformError::SinkWrite)?;

        info!(
            rows = written,
            unresolved = rows.unresolved(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transformation finished"
        );
        Ok(TransformSummary {
            rows: written,
            unresolved: rows.unresolved(),
            header_only: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{FakeHierarchySource, Hierarchy, HierarchyEntry};
    use std::io;
    use std::sync::Arc;

    fn resolver() -> HierarchyResolver {
        HierarchyResolver::new(Arc::new(FakeHierarchySource::new().with_hierarchy(
            Hierarchy {
                id: "E92000001".into(),
                kind: "other".into(),
                options: vec![HierarchyEntry {
                    code: "E92000001".into(),
                    name: "England".into(),
                    ..HierarchyEntry::default()
                }],
                ..Hierarchy::default()
            },
        )))
    }

    fn run(input: &str) -> TransformResult<(String, TransformSummary)> {
        let mut out = Vec::new();
        let summary = Transformer::new().transform(
            &mut input.as_bytes(),
            &mut out,
            &mut resolver(),
            "req-1",
        )?;
        Ok((String::from_utf8(out).unwrap(), summary))
    }

    #[test]
    fn expands_hierarchical_dimensions() -> anyhow::Result<()> {
        let (out, summary) = run(
            "Obs,Mark,Type,HID,DimName,Code\n10,ok,count,E92000001,Geography,E92000001\n",
        )?;
        assert_eq!(
            out,
            "Observation,Data_Marking,Observation_Type_Value,Dimension_1_Name,\
             Dimension_1_Hierarchy,Dimension_1_Code,Dimension_1_Value\n\
             10,ok,count,Geography,E92000001,E92000001,England\n"
        );
        assert_eq!(summary.rows, 1);
        assert!(!summary.header_only);
        Ok(())
    }

    #[test]
    fn header_only_input_is_written_back() -> anyhow::Result<()> {
        let (out, summary) = run("Obs,Mark,Type,HID,DimName,Code\n")?;
        assert_eq!(out, "Obs,Mark,Type,HID,DimName,Code\n");
        assert!(summary.header_only);
        assert_eq!(summary.rows, 0);
        Ok(())
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(run(""), Err(TransformError::MissingHeader)));
    }

    #[test]
    fn quoted_fields_survive() -> anyhow::Result<()> {
        let (out, _) = run("a,b,c,d,e,f\n\"1,5\",\"say \"\"hi\"\"\",x,,Label,\"v, w\"\n")?;
        let second = out.lines().nth(1).unwrap();
        assert_eq!(second, "\"1,5\",\"say \"\"hi\"\"\",x,Label,\"v, w\"");
        Ok(())
    }

    #[test]
    fn header_bytes_are_written_back_unchanged() -> anyhow::Result<()> {
        let input = b"Obs,Mark,Type,HID,DimName,Pr\xE9f\n";
        let mut out = Vec::new();
        let summary =
            Transformer::new().transform(&mut &input[..], &mut out, &mut resolver(), "req-1")?;
        assert!(summary.header_only);
        assert_eq!(out, input);
        Ok(())
    }

    #[test]
    fn short_row_mid_stream_is_malformed() {
        let err = run("a,b,c,d,e,f\n1,,x,,Sex,Male\n2,,x,,Sex\n").unwrap_err();
        assert!(matches!(err, TransformError::MalformedRow { line: 3, .. }));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failures_are_sink_errors() {
        let input = "a,b,c,d,e,f\n1,,x,,Sex,Male\n";
        let err = Transformer::new()
            .transform(
                &mut input.as_bytes(),
                &mut FailingWriter,
                &mut resolver(),
                "req-1",
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::SinkWrite(ref e) if e.kind() == io::ErrorKind::BrokenPipe
        ));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
        }
    }

    #[test]
    fn source_failures_are_read_errors() {
        let err = Transformer::new()
            .transform(&mut FailingReader, &mut Vec::new(), &mut resolver(), "req-1")
            .unwrap_err();
        assert!(matches!(err, TransformError::SourceRead { line: 1, .. }));
    }
}
