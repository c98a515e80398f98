/*!
Data types, sources and preprocessing
*/
use crate::*;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use ta::{Close, High, Low, Open, Volume};

pub mod offline;
pub mod fake;
pub mod scale;
pub mod window;
pub mod yahoo;

/// A single OHLCV bar for a stock
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Candle<F = CpuFloat> {
    /// This bar's timestamp, in the exchange's local offset
    pub t: DateTime<FixedOffset>,
    /// The opening price of this bar
    pub o: F,
    /// The high price of this bar
    pub h: F,
    /// The low price of this bar
    pub l: F,
    /// The closing price of this bar
    pub c: F,
    /// The volume traded during this bar
    pub v: F,
}

impl<F> Open for Candle<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn open(&self) -> f64 {
        self.o.into()
    }
}

impl<F> High for Candle<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn high(&self) -> f64 {
        self.h.into()
    }
}

impl<F> Low for Candle<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn low(&self) -> f64 {
        self.l.into()
    }
}

impl<F> Close for Candle<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn close(&self) -> f64 {
        self.c.into()
    }
}

impl<F> Volume for Candle<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn volume(&self) -> f64 {
        self.v.into()
    }
}

/// Sort candles chronologically, keeping only the last candle seen for any repeated timestamp
pub fn sort_dedup(candles: Vec<Candle>) -> Vec<Candle> {
    let mut candles: Vec<(usize, Candle)> = candles.into_iter().enumerate().collect();
    candles.sort_by(|a, b| a.1.t.cmp(&b.1.t).then_with(|| a.0.cmp(&b.0)));
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for (_, candle) in candles {
        if let Some(last) = deduped.last_mut() {
            if last.t == candle.t {
                *last = candle;
                continue;
            }
        }
        deduped.push(candle);
    }
    deduped
}

/// A closing price at a point in time
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// The timestamp of this price
    pub t: DateTime<FixedOffset>,
    /// The closing price
    pub c: CpuFloat,
}

/// A chronologically ordered series of closing prices.
///
/// Timestamps are strictly increasing and every price is finite. There are no mutators: a series is fixed once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, checking ordering and finiteness
    pub fn new(points: Vec<PricePoint>) -> Result<PriceSeries> {
        for pair in points.windows(2) {
            if pair[1].t <= pair[0].t {
                return Err(Error::DegenerateSeries(format!(
                    "timestamps not strictly increasing at {}",
                    pair[1].t
                )));
            }
        }
        if let Some(point) = points.iter().find(|point| !point.c.is_finite()) {
            return Err(Error::DegenerateSeries(format!(
                "non-finite close at {}",
                point.t
            )));
        }
        Ok(PriceSeries { points })
    }
    /// Build a series from the closing prices of a set of candles
    pub fn from_candles(candles: &[Candle]) -> Result<PriceSeries> {
        PriceSeries::new(
            candles
                .iter()
                .map(|candle| PricePoint {
                    t: candle.t,
                    c: candle.close(),
                })
                .collect(),
        )
    }
    /// The points in this series
    #[inline]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }
    /// The closing prices in this series, oldest first
    pub fn closes(&self) -> Vec<CpuFloat> {
        self.points.iter().map(|point| point.c).collect()
    }
    /// The number of points in this series
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }
    /// Whether this series is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Split a string like `15m` or `1mo` into its amount and unit
fn split_amount(s: &str) -> Option<(u32, &str)> {
    let digits = s.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 {
        return None;
    }
    let amount = s[..digits].parse().ok()?;
    if amount == 0 {
        return None;
    }
    Some((amount, &s[digits..]))
}

/// How far back to fetch data, in the provider's `range` vocabulary
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Period {
    /// A number of days, e.g. `7d`
    Days(u32),
    /// A number of weeks, e.g. `2wk`
    Weeks(u32),
    /// A number of months, e.g. `3mo`
    Months(u32),
    /// A number of years, e.g. `1y`
    Years(u32),
    /// From the start of the current year
    Ytd,
    /// All available history
    Max,
}

impl Period {
    /// The earliest timestamp included in this period when it ends at `end`.
    ///
    /// Returns `None` for `Max`, which has no lower bound.
    pub fn start(&self, end: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        match *self {
            Period::Days(n) => end.checked_sub_signed(Duration::days(n.into())),
            Period::Weeks(n) => end.checked_sub_signed(Duration::weeks(n.into())),
            Period::Months(n) => end.checked_sub_months(Months::new(n)),
            Period::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
            Period::Ytd => end
                .timezone()
                .with_ymd_and_hms(end.year(), 1, 1, 0, 0, 0)
                .single(),
            Period::Max => None,
        }
    }
}

impl FromStr for Period {
    type Err = Error;
    fn from_str(s: &str) -> Result<Period> {
        let invalid = || Error::InvalidArgument(format!("invalid period {:?}", s));
        match s {
            "ytd" => return Ok(Period::Ytd),
            "max" => return Ok(Period::Max),
            _ => {}
        }
        let (amount, unit) = split_amount(s).ok_or_else(invalid)?;
        match unit {
            "d" => Ok(Period::Days(amount)),
            "wk" => Ok(Period::Weeks(amount)),
            "mo" => Ok(Period::Months(amount)),
            "y" => Ok(Period::Years(amount)),
            _ => Err(invalid()),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}d", n),
            Period::Weeks(n) => write!(f, "{}wk", n),
            Period::Months(n) => write!(f, "{}mo", n),
            Period::Years(n) => write!(f, "{}y", n),
            Period::Ytd => write!(f, "ytd"),
            Period::Max => write!(f, "max"),
        }
    }
}

/// The spacing between bars, in the provider's `interval` vocabulary
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Interval {
    /// Minute bars, e.g. `5m`
    Minutes(u32),
    /// Hourly bars, e.g. `1h`
    Hours(u32),
    /// Daily bars, e.g. `1d`
    Days(u32),
    /// Weekly bars, e.g. `1wk`
    Weeks(u32),
    /// Monthly bars, e.g. `1mo`
    Months(u32),
}

impl Interval {
    /// The nominal length of one bar. Months count as 30 days.
    pub fn step(&self) -> Duration {
        match *self {
            Interval::Minutes(n) => Duration::minutes(n.into()),
            Interval::Hours(n) => Duration::hours(n.into()),
            Interval::Days(n) => Duration::days(n.into()),
            Interval::Weeks(n) => Duration::weeks(n.into()),
            Interval::Months(n) => Duration::days(30 * i64::from(n)),
        }
    }
    /// Whether bars at this interval are shorter than a day
    pub fn is_intraday(&self) -> bool {
        matches!(self, Interval::Minutes(_) | Interval::Hours(_))
    }
    /// Whether bars at this interval only exist on trading days
    pub fn trading_days_only(&self) -> bool {
        matches!(
            self,
            Interval::Minutes(_) | Interval::Hours(_) | Interval::Days(1)
        )
    }
}

impl FromStr for Interval {
    type Err = Error;
    fn from_str(s: &str) -> Result<Interval> {
        let invalid = || Error::InvalidArgument(format!("invalid interval {:?}", s));
        let (amount, unit) = split_amount(s).ok_or_else(invalid)?;
        match unit {
            "m" => Ok(Interval::Minutes(amount)),
            "h" => Ok(Interval::Hours(amount)),
            "d" => Ok(Interval::Days(amount)),
            "wk" => Ok(Interval::Weeks(amount)),
            "mo" => Ok(Interval::Months(amount)),
            _ => Err(invalid()),
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Interval::Minutes(n) => write!(f, "{}m", n),
            Interval::Hours(n) => write!(f, "{}h", n),
            Interval::Days(n) => write!(f, "{}d", n),
            Interval::Weeks(n) => write!(f, "{}wk", n),
            Interval::Months(n) => write!(f, "{}mo", n),
        }
    }
}

/// A source of historical market data
pub trait MarketData {
    /// Fetch the bars for `ticker` covering `period` at spacing `interval`, oldest first, without repeated timestamps
    fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Candle>>;
    /// Fetch the closing prices for `ticker`. An empty result is a `DataUnavailable` error.
    fn closes(&self, ticker: &str, period: Period, interval: Interval) -> Result<PriceSeries> {
        let candles = self.history(ticker, period, interval)?;
        if candles.is_empty() {
            return Err(Error::unavailable(ticker, "provider returned no rows"));
        }
        PriceSeries::from_candles(&candles)
    }
}

impl<M: MarketData + ?Sized> MarketData for Box<M> {
    fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        (**self).history(ticker, period, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::from_unix;

    fn candle(secs: i64, c: f64) -> Candle {
        Candle {
            t: from_unix(secs, 0).unwrap(),
            o: c,
            h: c,
            l: c,
            c,
            v: 100.0,
        }
    }

    #[test]
    fn period_parsing() {
        assert_eq!("7d".parse::<Period>().unwrap(), Period::Days(7));
        assert_eq!("1mo".parse::<Period>().unwrap(), Period::Months(1));
        assert_eq!("1y".parse::<Period>().unwrap(), Period::Years(1));
        assert_eq!("ytd".parse::<Period>().unwrap(), Period::Ytd);
        assert_eq!(Period::Months(6).to_string(), "6mo");
        assert!("0d".parse::<Period>().is_err());
        assert!("y".parse::<Period>().is_err());
        assert!("1h".parse::<Period>().is_err());
    }

    #[test]
    fn interval_parsing() {
        assert_eq!("1h".parse::<Interval>().unwrap(), Interval::Hours(1));
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::Minutes(15));
        assert_eq!("3mo".parse::<Interval>().unwrap(), Interval::Months(3));
        assert_eq!(Interval::Weeks(1).to_string(), "1wk");
        assert!("1y".parse::<Interval>().is_err());
        assert!(Interval::Days(1).trading_days_only());
        assert!(!Interval::Weeks(1).trading_days_only());
        assert!(Interval::Hours(1).is_intraday());
        assert!(!Interval::Days(1).is_intraday());
    }

    #[test]
    fn period_start() {
        let end = from_unix(1_704_067_200, 0).unwrap(); // 2024-01-01
        let start = Period::Years(1).start(end).unwrap();
        assert_eq!(start.to_rfc3339(), "2023-01-01T00:00:00+00:00");
        assert_eq!(Period::Days(7).start(end).unwrap(), end - Duration::days(7));
        assert_eq!(Period::Ytd.start(end).unwrap(), end);
        assert!(Period::Max.start(end).is_none());
    }

    #[test]
    fn dedup_keeps_last() {
        let candles = vec![candle(200, 2.0), candle(100, 1.0), candle(200, 3.0)];
        let candles = sort_dedup(candles);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].c, 1.0);
        assert_eq!(candles[1].c, 3.0);
    }

    #[test]
    fn series_rejects_unordered_and_nan() {
        let unordered = [candle(200, 2.0), candle(100, 1.0)];
        assert!(matches!(
            PriceSeries::from_candles(&unordered),
            Err(Error::DegenerateSeries(_))
        ));
        let nan = [candle(100, 1.0), candle(200, f64::NAN)];
        assert!(matches!(
            PriceSeries::from_candles(&nan),
            Err(Error::DegenerateSeries(_))
        ));
        let good = PriceSeries::from_candles(&[candle(100, 1.0), candle(200, 2.0)]).unwrap();
        assert_eq!(good.closes(), vec![1.0, 2.0]);
    }
}
