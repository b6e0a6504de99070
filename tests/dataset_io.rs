use bench_agent::{
    config::Config,
    dataset::{read_csv, write_csv},
    producer::generate,
    sample::SampleSeries,
};
use time::macros::datetime;

const HEADER: &str = "Timestamp,RPM,Oil_Pressure_bar\n";

#[test]
fn written_log_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_bench_log.csv");
    let series = generate(&Config::default(), 21).unwrap();

    write_csv(&series, &path).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with(HEADER));
    assert!(raw.lines().nth(1).unwrap().starts_with("2025-01-01 08:00:00,"));
    assert_eq!(raw.lines().count(), 601);

    assert_eq!(read_csv(&path).unwrap(), series);
}

#[test]
fn empty_series_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    write_csv(&SampleSeries::empty(), &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), HEADER);
    assert!(read_csv(&path).unwrap().is_empty());
}

#[test]
fn accepts_iso_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iso.csv");
    std::fs::write(
        &path,
        format!("{HEADER}2025-01-01T08:00:00,1000.0,4.5\n2025-01-01T08:00:01,1010.0,4.495\n"),
    )
    .unwrap();
    let series = read_csv(&path).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.samples()[1].rpm, 1010.0);
}

fn first_timestamp(dir: &std::path::Path, ts: &str) -> time::PrimitiveDateTime {
    let path = dir.join("one.csv");
    std::fs::write(&path, format!("{HEADER}{ts},1000.0,4.5\n")).unwrap();
    read_csv(&path)
        .unwrap_or_else(|e| panic!("{ts}: {e:#}"))
        .samples()[0]
        .timestamp
}

#[test]
fn accepts_fractional_seconds() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01 08:00:00.500"),
        datetime!(2025-01-01 08:00:00.5)
    );
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01 08:00:00.500000"),
        datetime!(2025-01-01 08:00:00.5)
    );
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01T08:00:00.25"),
        datetime!(2025-01-01 08:00:00.25)
    );
}

#[test]
fn accepts_rfc3339_offsets_as_utc() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01T08:00:00Z"),
        datetime!(2025-01-01 08:00:00)
    );
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01T08:00:00+00:00"),
        datetime!(2025-01-01 08:00:00)
    );
    assert_eq!(
        first_timestamp(dir.path(), "2025-01-01T10:00:00.5+02:00"),
        datetime!(2025-01-01 08:00:00.5)
    );
}

#[test]
fn fractional_seconds_survive_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.csv");
    std::fs::write(
        &src,
        format!("{HEADER}2025-01-01 08:00:00,1000.0,4.5\n2025-01-01 08:00:00.5,1001.0,4.4\n"),
    )
    .unwrap();
    let series = read_csv(&src).unwrap();

    let copy = dir.path().join("copy.csv");
    write_csv(&series, &copy).unwrap();
    let raw = std::fs::read_to_string(&copy).unwrap();
    assert!(raw.lines().nth(1).unwrap().starts_with("2025-01-01 08:00:00,"));
    assert!(raw.lines().nth(2).unwrap().starts_with("2025-01-01 08:00:00.5,"));
    assert_eq!(read_csv(&copy).unwrap(), series);
}

#[test]
fn rejects_out_of_order_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        format!("{HEADER}2025-01-01 08:00:01,1000,4.5\n2025-01-01 08:00:01,1001,4.4\n"),
    )
    .unwrap();
    let err = format!("{:#}", read_csv(&path).unwrap_err());
    assert!(err.contains("does not increase"), "{err}");
}

#[test]
fn rejects_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nan.csv");
    std::fs::write(&path, format!("{HEADER}2025-01-01 08:00:00,NaN,4.5\n")).unwrap();
    let err = format!("{:#}", read_csv(&path).unwrap_err());
    assert!(err.contains("rpm is not finite"), "{err}");
}

#[test]
fn rejects_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.csv");
    std::fs::write(&path, format!("{HEADER}2025-01-01 08:00:00,fast,4.5\n")).unwrap();
    let err = format!("{:#}", read_csv(&path).unwrap_err());
    assert!(err.contains(":2: malformed row"), "{err}");

    std::fs::write(&path, format!("{HEADER}noon,1000,4.5\n")).unwrap();
    let err = format!("{:#}", read_csv(&path).unwrap_err());
    assert!(err.contains("invalid timestamp"), "{err}");
}
