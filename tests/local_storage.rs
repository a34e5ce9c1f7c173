//! Jobs against filesystem-backed storage.

use anyhow::Result;
use csv_transformer::io::cloud::{LocalObjectIO, ObjectIO};
use csv_transformer::testing::*;
use csv_transformer::{Config, JobHandler, TransformRequest, Transformer};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn handler(root: &Path, temp: &Path, use_gzip: bool) -> JobHandler {
    let config = Config {
        use_gzip,
        temp_dir: temp.to_path_buf(),
        ..Config::default()
    };
    JobHandler::new(
        config,
        Arc::new(LocalObjectIO::new(root)),
        Arc::new(sample_hierarchies()),
        Arc::new(Transformer::new()),
    )
}

#[test]
fn gzip_output_lands_on_disk_with_its_encoding() -> Result<()> {
    let root = tempfile::tempdir()?;
    let temp = tempfile::tempdir()?;
    let storage = LocalObjectIO::new(root.path());
    storage.put_object("in", "nested/multi.csv", MULTI_DIMENSION_INPUT.as_bytes())?;

    let request = TransformRequest::new(
        "s3://in/nested/multi.csv",
        "s3://out/reports/multi.csv",
        "local-1",
    )?;
    let summary = handler(root.path(), temp.path(), true).execute(&request)?;
    assert_eq!(summary.rows, MULTI_DIMENSION_ROWS as u64);

    let meta = storage.get_metadata("out", "reports/multi.csv")?;
    assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
    let raw = fs::read(root.path().join("out").join("reports").join("multi.csv"))?;
    let rows = csv_rows(&decode_content(&raw, meta.content_encoding.as_deref())?)?;
    assert_eq!(rows.len(), MULTI_DIMENSION_ROWS + 1);
    assert_uniform_width(&rows);

    assert!(!root.path().join("out/reports/multi.csv.partial").exists());
    assert_eq!(fs::read_dir(temp.path())?.count(), 0);
    Ok(())
}

#[test]
fn failed_job_leaves_no_object_on_disk() -> Result<()> {
    let root = tempfile::tempdir()?;
    let temp = tempfile::tempdir()?;
    let storage = LocalObjectIO::new(root.path());
    storage.put_object("in", "bad.csv", b"a,b,c,d,e,f\n1,,x,,Sex\n")?;

    let request = TransformRequest::new("s3://in/bad.csv", "s3://out/bad.csv", "local-2")?;
    let response = handler(root.path(), temp.path(), false).handle(&request);
    assert!(!response.is_success());
    assert!(!storage.object_exists("out", "bad.csv")?);
    assert_eq!(fs::read_dir(temp.path())?.count(), 0);
    Ok(())
}
