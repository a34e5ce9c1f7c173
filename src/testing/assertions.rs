//! Helpers for inspecting transformed output.

use std::io;

/// Parse CSV bytes into rows of cells, header included.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CSV.
///
/// # Example
///
/// ```
/// use csv_transformer::testing::csv_rows;
///
/// let rows = csv_rows(b"a,\"b,c\"\n1,2\n").unwrap();
/// assert_eq!(rows, vec![vec!["a", "b,c"], vec!["1", "2"]]);
/// ```
pub fn csv_rows(bytes: &[u8]) -> csv::Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect()
}

/// Decode a gzip stream.
///
/// # Errors
///
/// Returns an error if `bytes` is not a complete gzip stream.
#[cfg(feature = "compression-gzip")]
pub fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

/// Decode `bytes` according to a stored content-encoding marker.
///
/// # Errors
///
/// Returns an error for an unknown encoding or a corrupt stream.
pub fn decode_content(bytes: &[u8], content_encoding: Option<&str>) -> io::Result<Vec<u8>> {
    match content_encoding {
        None => Ok(bytes.to_vec()),
        #[cfg(feature = "compression-gzip")]
        Some("gzip") => gunzip(bytes),
        Some(other) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported content encoding {other:?}"),
        )),
    }
}

/// Assert that every row has the same number of cells.
///
/// # Panics
///
/// Panics if a row's width differs from the first row's.
pub fn assert_uniform_width(rows: &[Vec<String>]) {
    let Some(first) = rows.first() else {
        return;
    };
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(
            row.len(),
            first.len(),
            "Row {i} has {} cells, expected {}:\n  Row: {row:?}",
            row.len(),
            first.len()
        );
    }
}

/// Assert that a parsed row equals `expected`.
///
/// # Panics
///
/// Panics if the rows differ.
pub fn assert_row_eq(actual: &[String], expected: &[&str]) {
    assert_eq!(
        actual,
        expected,
        "Row mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}
