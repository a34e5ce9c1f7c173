//! Sample inputs and hierarchies for transform tests.

use crate::hierarchy::{FakeHierarchySource, Hierarchy, HierarchyEntry, LevelType};

/// A single-dimension source whose one hierarchical code resolves to `"England"`.
pub const ROUND_TRIP_INPUT: &str =
    "Obs,Mark,Type,HID,DimName,Code\n10,ok,count,E92000001,Geography,E92000001\n";

/// Output header expected for [`ROUND_TRIP_INPUT`].
pub const ROUND_TRIP_HEADER: [&str; 7] = [
    "Observation",
    "Data_Marking",
    "Observation_Type_Value",
    "Dimension_1_Name",
    "Dimension_1_Hierarchy",
    "Dimension_1_Code",
    "Dimension_1_Value",
];

/// Output row expected for [`ROUND_TRIP_INPUT`].
pub const ROUND_TRIP_ROW: [&str; 7] = [
    "10",
    "ok",
    "count",
    "Geography",
    "E92000001",
    "E92000001",
    "England",
];

/// Header-only source.
pub const HEADER_ONLY_INPUT: &str = "Obs,Mark,Type,HID,DimName,Code\n";

/// Geography hierarchy id used by [`MULTI_DIMENSION_INPUT`].
pub const GEOGRAPHY_ID: &str = "CL_0000641";

/// Time hierarchy id used by [`MULTI_DIMENSION_INPUT`].
pub const TIME_ID: &str = "CL_0000001";

/// Three dimensions (geography, plain sex, time) over five rows; row 4 (line 5) carries a
/// geography code the hierarchy does not know.
pub const MULTI_DIMENSION_INPUT: &str = "\
observation,data_marking,observation_type_value,geo_hierarchy,geo_name,geo_code,sex_hierarchy,sex_name,sex_value,time_hierarchy,time_name,time_code
1234,,Count,CL_0000641,Geography,K02000001,,Sex,All,CL_0000001,Time,2016
567,,Count,CL_0000641,Geography,E92000001,,Sex,Male,CL_0000001,Time,2016
89,p,Count,CL_0000641,Geography,W92000004,,Sex,Female,CL_0000001,Time,2015
10,,Count,CL_0000641,Geography,X99999999,,Sex,Male,CL_0000001,Time,2015
\"1,011\",,Count,CL_0000641,Geography,E92000001,,Sex,\"Male, adult\",CL_0000001,Time,2014
";

/// Number of data rows in [`MULTI_DIMENSION_INPUT`].
pub const MULTI_DIMENSION_ROWS: usize = 5;

/// Output column count for [`MULTI_DIMENSION_INPUT`]: 3 fixed + 4 geography + 2 sex + 3 time.
pub const MULTI_DIMENSION_WIDTH: usize = 12;

fn entry(code: &str, name: &str, options: Vec<HierarchyEntry>) -> HierarchyEntry {
    HierarchyEntry {
        code: code.to_string(),
        name: name.to_string(),
        options,
        ..HierarchyEntry::default()
    }
}

/// The hierarchy backing [`ROUND_TRIP_INPUT`]: id `E92000001`, type `"other"`.
#[must_use]
pub fn round_trip_hierarchy() -> Hierarchy {
    Hierarchy {
        id: "E92000001".to_string(),
        name: "England".to_string(),
        kind: "other".to_string(),
        options: vec![entry("E92000001", "England", vec![])],
    }
}

/// A small UK geography tree.
#[must_use]
pub fn geography_hierarchy() -> Hierarchy {
    let country = |code: &str, name: &str| HierarchyEntry {
        level_type: Some(LevelType {
            code: "CTRY".to_string(),
            name: "Country".to_string(),
            level: 1,
        }),
        has_data: true,
        ..entry(code, name, vec![])
    };
    Hierarchy {
        id: GEOGRAPHY_ID.to_string(),
        name: "Geography".to_string(),
        kind: "geography".to_string(),
        options: vec![HierarchyEntry {
            level_type: Some(LevelType {
                code: "UK".to_string(),
                name: "United Kingdom".to_string(),
                level: 0,
            }),
            ..entry(
                "K02000001",
                "United Kingdom",
                vec![
                    country("E92000001", "England"),
                    country("W92000004", "Wales"),
                    country("S92000003", "Scotland"),
                ],
            )
        }],
    }
}

/// A `"time"` hierarchy of calendar years.
#[must_use]
pub fn time_hierarchy() -> Hierarchy {
    Hierarchy {
        id: TIME_ID.to_string(),
        name: "Time".to_string(),
        kind: "time".to_string(),
        options: ["2014", "2015", "2016"]
            .into_iter()
            .map(|year| entry(year, year, vec![]))
            .collect(),
    }
}

/// A source serving the round-trip, geography and time hierarchies.
///
/// ```
/// use csv_transformer::hierarchy::HierarchySource;
/// use csv_transformer::testing::sample_hierarchies;
///
/// let source = sample_hierarchies();
/// assert!(source.fetch_hierarchy("CL_0000001").unwrap().is_time());
/// ```
#[must_use]
pub fn sample_hierarchies() -> FakeHierarchySource {
    FakeHierarchySource::new()
        .with_hierarchy(round_trip_hierarchy())
        .with_hierarchy(geography_hierarchy())
        .with_hierarchy(time_hierarchy())
}
