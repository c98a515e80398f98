/*!
Offline market data: candles stored as CSV files, one file per ticker
*/
use super::{sort_dedup, Candle, Interval, MarketData, Period};
use crate::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read candle data from a Reader.
///
/// The expected header is `t,o,h,l,c,v`, with RFC 3339 timestamps. Any malformed row is an error.
pub fn read_candles<R: Read>(rdr: R) -> Result<Vec<Candle>> {
    let mut candles = Vec::new();
    for candle in csv::Reader::from_reader(rdr).into_deserialize() {
        candles.push(candle?);
    }
    Ok(candles)
}

/// Write candle data to a Writer.
/// On success, return how many candles were written
pub fn write_candles<W, I>(wtr: W, candles: I) -> Result<usize>
where
    W: Write,
    I: Iterator<Item = Candle>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut written = 0;
    for candle in candles {
        wtr.serialize(candle)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// A directory of candle CSV files acting as a market data provider.
///
/// A request for `AAPL` at `1h` reads `AAPL_1h.csv` if present, else `AAPL.csv`. The plain file is used as-is
/// whatever its bar spacing.
#[derive(Debug, Clone)]
pub struct CsvSource {
    /// The directory holding the CSV files
    pub dir: PathBuf,
}

impl CsvSource {
    /// Serve candles from the files in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> CsvSource {
        CsvSource { dir: dir.into() }
    }
    /// The file holding a given ticker's candles at any spacing
    pub fn path_for(&self, ticker: &str) -> Result<PathBuf> {
        check_ticker(ticker)?;
        Ok(self.dir.join(format!("{}.csv", ticker)))
    }
    /// The file holding a given ticker's candles at `interval`
    pub fn interval_path_for(&self, ticker: &str, interval: Interval) -> Result<PathBuf> {
        check_ticker(ticker)?;
        Ok(self.dir.join(format!("{}_{}.csv", ticker, interval)))
    }
}

fn check_ticker(ticker: &str) -> Result<()> {
    let valid = !ticker.is_empty()
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        && !ticker.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid ticker {:?}", ticker)))
    }
}

fn open(path: &Path) -> Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

impl MarketData for CsvSource {
    fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        let exact = self.interval_path_for(ticker, interval)?;
        let plain = self.path_for(ticker)?;
        let (path, file) = match open(&exact)? {
            Some(file) => (exact, file),
            None => match open(&plain)? {
                Some(file) => (plain, file),
                None => {
                    return Err(Error::unavailable(
                        ticker,
                        format!("no file at {} or {}", exact.display(), plain.display()),
                    ))
                }
            },
        };
        let mut candles = sort_dedup(read_candles(file)?);
        if let Some(start) = candles.last().and_then(|last| period.start(last.t)) {
            candles.retain(|candle| candle.t >= start);
        }
        debug!(
            ticker,
            %period,
            %interval,
            rows = candles.len(),
            "loaded candles from {}",
            path.display()
        );
        Ok(candles)
    }
}
