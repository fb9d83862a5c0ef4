use std::fs::File;
use std::io::Write;

use feeder_config::{SampleRow, load_samples_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("samples.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_rows_with_optional_fields() {
    let (_dir, path) = write_csv(&["channel,raw,grams", "1,1000,", "2,,12.5", "1,1010.5,3"]);
    let rows = load_samples_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            SampleRow {
                channel: 1,
                raw: Some(1000.0),
                grams: None
            },
            SampleRow {
                channel: 2,
                raw: None,
                grams: Some(12.5)
            },
            SampleRow {
                channel: 1,
                raw: Some(1010.5),
                grams: Some(3.0)
            },
        ]
    );
}

#[rstest]
fn rejects_bad_headers() {
    let (_dir, path) = write_csv(&["scale,raw,grams", "1,1000,"]);
    let err = load_samples_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("must have headers 'channel,raw,grams'"));
}

#[rstest]
#[case("3,1000,")]
#[case("0,1000,")]
fn rejects_unknown_channel(#[case] row: &str) {
    let (_dir, path) = write_csv(&["channel,raw,grams", row]);
    let err = load_samples_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("unknown channel"));
}

#[rstest]
fn reports_row_number_for_malformed_value() {
    let (_dir, path) = write_csv(&["channel,raw,grams", "1,1000,", "1,abc,"]);
    let err = load_samples_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 3"));
}
