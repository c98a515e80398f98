/*!
Generate fake candle data, for testing purposes
*/
use super::{Candle, Interval, MarketData, Period};
use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Generate candles using a geometric random walk.
///
/// Prices stay strictly positive, and `l <= min(o, c) <= max(o, c) <= h` always holds.
#[derive(Debug, Clone)]
pub struct RandomWalk<R> {
    /// The RNG used by this random walk
    pub rng: R,
    /// The current price
    pub price: f64,
    /// Log-return drift per bar
    pub drift: f64,
    /// Log-return noise per bar
    pub noise: Normal<f64>,
    /// Bar volume distribution, absolute value taken
    pub volume: Normal<f64>,
}

impl<R: Rng> RandomWalk<R> {
    /// Produce the next candle, stamped with `t`
    pub fn candle(&mut self, t: DateTime<FixedOffset>) -> Candle {
        let o = self.price;
        let c = o * (self.drift + self.noise.sample(&mut self.rng)).exp();
        let wick = self.noise.sample(&mut self.rng).abs();
        let h = o.max(c) * (1.0 + wick);
        let l = o.min(c) / (1.0 + wick);
        let v = self.volume.sample(&mut self.rng).abs().round();
        self.price = c;
        Candle { t, o, h, l, c, v }
    }
}

/// The timestamps of every bar of `interval` from `start` to `end` inclusive, skipping weekends where applicable
pub fn bar_times(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    interval: Interval,
) -> Vec<DateTime<FixedOffset>> {
    let step = interval.step();
    let mut times = Vec::new();
    if step <= Duration::zero() {
        return times;
    }
    let mut t = start;
    while t <= end {
        let weekend = matches!(t.weekday(), Weekday::Sat | Weekday::Sun);
        if !(weekend && interval.trading_days_only()) {
            times.push(t);
        }
        t = match t.checked_add_signed(step) {
            Some(t) => t,
            None => break,
        };
    }
    times
}

/// A deterministic market data source producing random walks.
///
/// Each ticker gets its own walk, seeded from the source seed and the ticker name, so repeated fetches agree.
#[derive(Debug, Clone)]
pub struct FakeSource {
    /// The base seed
    pub seed: u64,
    /// The timestamp of the last bar of every fetch
    pub end: DateTime<FixedOffset>,
    /// If set, the only tickers this source knows about
    pub listed: Option<Vec<String>>,
}

impl FakeSource {
    /// Create a fake source ending at `end`
    pub fn new(seed: u64, end: DateTime<FixedOffset>) -> FakeSource {
        FakeSource {
            seed,
            end,
            listed: None,
        }
    }
    /// Restrict the tickers this source will answer for
    pub fn listing<I, S>(mut self, tickers: I) -> FakeSource
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.listed = Some(tickers.into_iter().map(Into::into).collect());
        self
    }
    fn walk(&self, ticker: &str) -> Result<RandomWalk<StdRng>> {
        let seed = ticker
            .bytes()
            .fold(self.seed, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
        let mut rng = StdRng::seed_from_u64(seed);
        let price = rng.gen_range(20.0..250.0);
        let noise =
            Normal::new(0.0, 0.015).map_err(|err| Error::InvalidArgument(err.to_string()))?;
        let volume =
            Normal::new(1.0e6, 2.5e5).map_err(|err| Error::InvalidArgument(err.to_string()))?;
        Ok(RandomWalk {
            rng,
            price,
            drift: 2.0e-4,
            noise,
            volume,
        })
    }
}

impl MarketData for FakeSource {
    fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        if let Some(listed) = &self.listed {
            if !listed.iter().any(|listed| listed == ticker) {
                return Err(Error::unavailable(ticker, "symbol may be delisted"));
            }
        }
        let start = period
            .start(self.end)
            .or_else(|| self.end.checked_sub_signed(Duration::days(365 * 10)))
            .unwrap_or(self.end);
        let mut walk = self.walk(ticker)?;
        Ok(bar_times(start, self.end, interval)
            .into_iter()
            .map(|t| walk.candle(t))
            .collect())
    }
}
