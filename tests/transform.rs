use anyhow::Result;
use csv_transformer::TransformError;
use csv_transformer::hierarchy::{FakeHierarchySource, HierarchyResolver};
use csv_transformer::testing::*;
use csv_transformer::transform::{CsvTransform, TransformSummary, Transformer};
use std::sync::Arc;

fn transform_with(
    source: FakeHierarchySource,
    input: &str,
) -> Result<(Vec<Vec<String>>, TransformSummary), TransformError> {
    let mut resolver = HierarchyResolver::new(Arc::new(source));
    let mut output = Vec::new();
    let summary =
        Transformer::new().transform(&mut input.as_bytes(), &mut output, &mut resolver, "t")?;
    Ok((csv_rows(&output).expect("output is valid CSV"), summary))
}

fn transform(input: &str) -> Result<(Vec<Vec<String>>, TransformSummary), TransformError> {
    transform_with(sample_hierarchies(), input)
}

#[test]
fn round_trip_scenario() -> Result<()> {
    let (rows, summary) = transform(ROUND_TRIP_INPUT)?;
    assert_eq!(rows.len(), 2);
    assert_row_eq(&rows[0], &ROUND_TRIP_HEADER);
    assert_row_eq(&rows[1], &ROUND_TRIP_ROW);
    assert_eq!(summary.rows, 1);
    assert_eq!(summary.unresolved, 0);
    Ok(())
}

#[test]
fn header_only_input_is_idempotent() -> Result<()> {
    let source = sample_hierarchies();
    let (rows, summary) = transform_with(source.clone(), HEADER_ONLY_INPUT)?;
    assert_eq!(rows.len(), 1);
    assert_row_eq(&rows[0], &["Obs", "Mark", "Type", "HID", "DimName", "Code"]);
    assert!(summary.header_only);
    // no model is built, so nothing is fetched
    assert_eq!(source.total_fetches(), 0);
    Ok(())
}

#[test]
fn rows_are_preserved_in_order() -> Result<()> {
    let (rows, summary) = transform(MULTI_DIMENSION_INPUT)?;
    assert_eq!(rows.len(), MULTI_DIMENSION_ROWS + 1);
    assert_eq!(summary.rows, MULTI_DIMENSION_ROWS as u64);

    let observations: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(observations, vec!["1234", "567", "89", "10", "1,011"]);
    Ok(())
}

#[test]
fn every_row_has_the_model_width() -> Result<()> {
    let (rows, _) = transform(MULTI_DIMENSION_INPUT)?;
    assert_uniform_width(&rows);
    assert_eq!(rows[0].len(), MULTI_DIMENSION_WIDTH);
    Ok(())
}

#[test]
fn time_hierarchies_have_no_value_column() -> Result<()> {
    let (rows, _) = transform(MULTI_DIMENSION_INPUT)?;
    let header = &rows[0];
    assert!(header.contains(&"Dimension_3_Code".to_string()));
    assert!(!header.contains(&"Dimension_3_Value".to_string()));
    assert!(header.contains(&"Dimension_1_Value".to_string()));
    // the time code 2016 resolves in its hierarchy, yet the row ends with the raw code
    assert_row_eq(
        &rows[1],
        &[
            "1234",
            "",
            "Count",
            "Geography",
            "CL_0000641",
            "K02000001",
            "United Kingdom",
            "Sex",
            "All",
            "Time",
            "CL_0000001",
            "2016",
        ],
    );
    Ok(())
}

#[test]
fn unknown_codes_only_blank_their_own_cell() -> Result<()> {
    let (rows, summary) = transform(MULTI_DIMENSION_INPUT)?;
    assert_eq!(summary.unresolved, 1);

    let values: Vec<&str> = rows[1..].iter().map(|r| r[6].as_str()).collect();
    assert_eq!(
        values,
        vec!["United Kingdom", "England", "Wales", "", "England"]
    );
    // the rest of the row with the unknown code is intact
    assert_eq!(rows[4][5], "X99999999");
    assert_eq!(rows[4][8], "Male");
    Ok(())
}

#[test]
fn quoted_cells_round_trip() -> Result<()> {
    let (rows, _) = transform(MULTI_DIMENSION_INPUT)?;
    assert_eq!(rows[5][0], "1,011");
    assert_eq!(rows[5][8], "Male, adult");
    Ok(())
}

#[test]
fn non_utf8_cells_pass_through_unchanged() -> Result<()> {
    let input = b"o,m,t,h,n,v\n5,,x,,Price band,\xA310\n6,,x,,Price band,20\n";
    let mut resolver = HierarchyResolver::new(Arc::new(sample_hierarchies()));
    let mut output = Vec::new();
    let summary = Transformer::new().transform(&mut &input[..], &mut output, &mut resolver, "t")?;

    assert_eq!(summary.rows, 2);
    let expected: &[u8] = b"Observation,Data_Marking,Observation_Type_Value,\
        Dimension_1_Name,Dimension_1_Value\n\
        5,,x,Price band,\xA310\n\
        6,,x,Price band,20\n";
    assert_eq!(output, expected);
    Ok(())
}

#[test]
fn hierarchy_outage_during_model_construction_is_fatal() {
    let source = sample_hierarchies().with_failing(GEOGRAPHY_ID);
    let err = transform_with(source, MULTI_DIMENSION_INPUT).unwrap_err();
    assert!(matches!(err, TransformError::HierarchyFetch { .. }));
    assert!(err.is_fatal());
}

#[test]
fn each_hierarchy_is_fetched_once_per_job() -> Result<()> {
    let source = sample_hierarchies();
    transform_with(source.clone(), MULTI_DIMENSION_INPUT)?;
    assert_eq!(source.fetch_count(GEOGRAPHY_ID), 1);
    assert_eq!(source.fetch_count(TIME_ID), 1);
    Ok(())
}

#[test]
fn inconsistent_rows_abort_the_job() {
    let input = format!("{MULTI_DIMENSION_INPUT}1,,Count,CL_0000641,Geography,E92000001\n");
    let err = transform(&input).unwrap_err();
    assert!(matches!(
        err,
        TransformError::MalformedRow {
            line: 7,
            expected: 12,
            actual: 6
        }
    ));
}

#[test]
fn plain_only_rows_need_no_hierarchy_service() -> Result<()> {
    let source = FakeHierarchySource::new();
    let (rows, _) = transform_with(
        source.clone(),
        "o,m,t,h,n,v\n5,,x,,Sex,Male\n6,,x,,Sex,Female\n",
    )?;
    assert_row_eq(
        &rows[0],
        &[
            "Observation",
            "Data_Marking",
            "Observation_Type_Value",
            "Dimension_1_Name",
            "Dimension_1_Value",
        ],
    );
    assert_row_eq(&rows[2], &["6", "", "x", "Sex", "Female"]);
    assert_eq!(source.total_fetches(), 0);
    Ok(())
}
