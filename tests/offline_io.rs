/*!
Test CSV candle IO
*/
use std::fs::File;
use std::io::{Seek, SeekFrom};
use stockcast::data::{fake::*, offline::*, *};
use stockcast::util::from_unix;
use stockcast::Error;
use tempfile::{tempdir, tempfile};

fn fake_candles(period: Period, interval: Interval) -> Vec<Candle> {
    let end = from_unix(1_719_532_800, 0).unwrap();
    FakeSource::new(3, end)
        .history("TEST", period, interval)
        .expect("Fake data should not fail")
}

#[test]
fn fake_data_roundtrip() {
    let candles = fake_candles(Period::Years(2), Interval::Days(1));
    let mut tmp = tempfile().expect("Tempfile creation should not fail!");
    let written = write_candles(&mut tmp, candles.iter().copied())
        .expect("Writing test data should not fail!");
    assert_eq!(written, candles.len());
    tmp.seek(SeekFrom::Start(0)).expect("Seek should not fail");
    let read = read_candles(&mut tmp).expect("Reading test data should not fail");
    assert_eq!(candles, read);
}

#[test]
fn csv_source_serves_written_files() {
    let dir = tempdir().expect("Tempdir creation should not fail!");
    let candles = fake_candles(Period::Years(1), Interval::Days(1));
    let mut shuffled = candles.clone();
    shuffled.reverse();
    shuffled.push(candles[0]);
    let file = File::create(dir.path().join("TEST.csv")).unwrap();
    write_candles(file, shuffled.into_iter()).unwrap();

    let source = CsvSource::new(dir.path());
    let all = source
        .history("TEST", Period::Max, Interval::Days(1))
        .unwrap();
    assert_eq!(all, candles);

    let series = source
        .closes("TEST", Period::Days(30), Interval::Days(1))
        .unwrap();
    assert!(series.len() < 30 && series.len() > 15, "{}", series.len());
    assert_eq!(series.points().last().unwrap().c, candles.last().unwrap().c);

    assert!(matches!(
        source.closes("MISSING", Period::Max, Interval::Days(1)),
        Err(Error::DataUnavailable { .. })
    ));
}

#[test]
fn csv_source_prefers_interval_files() {
    let dir = tempdir().expect("Tempdir creation should not fail!");
    let daily = fake_candles(Period::Months(3), Interval::Days(1));
    let hourly = fake_candles(Period::Days(5), Interval::Hours(1));
    write_candles(
        File::create(dir.path().join("TEST.csv")).unwrap(),
        daily.iter().copied(),
    )
    .unwrap();
    write_candles(
        File::create(dir.path().join("TEST_1h.csv")).unwrap(),
        hourly.iter().copied(),
    )
    .unwrap();

    let source = CsvSource::new(dir.path());
    assert_eq!(
        source
            .history("TEST", Period::Max, Interval::Hours(1))
            .unwrap(),
        hourly
    );
    assert_eq!(
        source
            .history("TEST", Period::Max, Interval::Days(1))
            .unwrap(),
        daily
    );
}
