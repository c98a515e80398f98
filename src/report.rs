/*!
Plain-text views of a price series for local runs: a line summary, a moving average and a histogram
*/
use crate::data::PriceSeries;
use crate::service::Forecast;
use crate::{CpuFloat, Error, Result};
use itertools::{Itertools, MinMaxResult};
use std::fmt::Write;
use ta::indicators::SimpleMovingAverage;
use ta::Next;

/// The default number of histogram bins
pub const DEFAULT_BINS: usize = 30;

/// Summary statistics of a series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    /// Number of points
    pub count: usize,
    /// First close
    pub first: CpuFloat,
    /// Last close
    pub last: CpuFloat,
    /// Lowest close
    pub min: CpuFloat,
    /// Highest close
    pub max: CpuFloat,
    /// Mean close
    pub mean: CpuFloat,
    /// Change from first to last, in percent
    pub change_pct: CpuFloat,
    /// Simple moving average of the last `sma_period` closes, if the series is long enough
    pub sma: Option<CpuFloat>,
    /// The moving average period
    pub sma_period: usize,
}

impl SeriesSummary {
    /// Summarize a series, with a moving average over `sma_period` closes
    pub fn new(series: &PriceSeries, sma_period: usize) -> Result<SeriesSummary> {
        let closes = series.closes();
        let (min, max) = match closes.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => {
                return Err(Error::InsufficientHistory {
                    available: 0,
                    required: 1,
                })
            }
            MinMaxResult::OneElement(x) => (x, x),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let first = closes[0];
        let last = closes[closes.len() - 1];
        let mean = closes.iter().sum::<CpuFloat>() / closes.len() as CpuFloat;
        let sma = if sma_period > 0 && closes.len() >= sma_period {
            let mut indicator = SimpleMovingAverage::new(sma_period)
                .map_err(|err| Error::InvalidArgument(format!("{:?}", err)))?;
            closes.iter().map(|&close| indicator.next(close)).last()
        } else {
            None
        };
        Ok(SeriesSummary {
            count: closes.len(),
            first,
            last,
            min,
            max,
            mean,
            change_pct: if first != 0.0 {
                (last - first) / first * 100.0
            } else {
                0.0
            },
            sma,
            sma_period,
        })
    }
}

/// One histogram bucket, covering `[lo, hi)` (the last bucket also includes `hi`)
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Lower edge
    pub lo: CpuFloat,
    /// Upper edge
    pub hi: CpuFloat,
    /// Values falling in this bucket
    pub count: usize,
}

/// Bucket values into `bins` equal-width bins spanning their range. A constant input lands in one bin.
pub fn histogram(values: &[CpuFloat], bins: usize) -> Vec<Bin> {
    let (lo, hi) = match values.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(x) => (x, x),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    if bins == 0 {
        return Vec::new();
    }
    if lo == hi {
        return vec![Bin {
            lo,
            hi,
            count: values.len(),
        }];
    }
    let width = (hi - lo) / bins as CpuFloat;
    let mut result: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lo: lo + width * i as CpuFloat,
            hi: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as CpuFloat
            },
            count: 0,
        })
        .collect();
    for &value in values {
        let i = (((value - lo) / width) as usize).min(bins - 1);
        result[i].count += 1;
    }
    result
}

/// Render a summary, a histogram and a forecast as text
pub fn render(
    ticker: &str,
    summary: &SeriesSummary,
    bins: &[Bin],
    forecast: Option<&Forecast>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} over {} closes", ticker, summary.count);
    let _ = writeln!(
        out,
        "  first {:.2}  last {:.2}  change {:+.2}%",
        summary.first, summary.last, summary.change_pct
    );
    let _ = writeln!(
        out,
        "  min {:.2}  max {:.2}  mean {:.2}",
        summary.min, summary.max, summary.mean
    );
    if let Some(sma) = summary.sma {
        let _ = writeln!(out, "  sma({}) {:.2}", summary.sma_period, sma);
    }

    let widest = bins.iter().map(|bin| bin.count).max().unwrap_or(0).max(1);
    let _ = writeln!(out, "\nclose price distribution");
    for bin in bins {
        let bar = "#".repeat((bin.count * 40 + widest - 1) / widest);
        let _ = writeln!(
            out,
            "  {:>10.2} .. {:<10.2} {:>4} {}",
            bin.lo, bin.hi, bin.count, bar
        );
    }

    if let Some(forecast) = forecast {
        let _ = writeln!(
            out,
            "\npredicted closes ({} training windows, final loss {})",
            forecast.training_windows,
            forecast
                .final_loss
                .map(|loss| format!("{:.6}", loss))
                .unwrap_or_else(|| "n/a".to_string())
        );
        for (i, prediction) in forecast.predictions.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}: {:.2}", i + 1, prediction);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PricePoint;
    use crate::util::from_unix;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| PricePoint {
                    t: from_unix(86_400 * i as i64, 0).unwrap(),
                    c,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn summary() {
        let summary = SeriesSummary::new(&series(&[10.0, 12.0, 8.0, 11.0]), 2).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 8.0);
        assert_eq!(summary.max, 12.0);
        assert_eq!(summary.mean, 10.25);
        assert!((summary.change_pct - 10.0).abs() < 1e-9);
        assert_eq!(summary.sma, Some(9.5));
        assert_eq!(SeriesSummary::new(&series(&[1.0]), 5).unwrap().sma, None);
        assert!(SeriesSummary::new(&series(&[]), 5).is_err());
    }

    #[test]
    fn histogram_counts_everything() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let bins = histogram(&values, DEFAULT_BINS);
        assert_eq!(bins.len(), 30);
        assert_eq!(bins.iter().map(|bin| bin.count).sum::<usize>(), 100);
        assert_eq!(bins[29].hi, 99.0);
        assert!(bins[29].count > 0);

        let flat = histogram(&[3.0; 7], DEFAULT_BINS);
        assert_eq!(flat, vec![Bin { lo: 3.0, hi: 3.0, count: 7 }]);
        assert!(histogram(&[], DEFAULT_BINS).is_empty());
    }

    #[test]
    fn renders_predictions() {
        let s = series(&[10.0, 11.0, 12.0]);
        let summary = SeriesSummary::new(&s, 2).unwrap();
        let forecast = Forecast {
            ticker: "T".into(),
            predictions: vec![12.5, 13.25],
            training_windows: 340,
            final_loss: Some(0.001),
        };
        let text = render("T", &summary, &histogram(&s.closes(), 3), Some(&forecast));
        assert!(text.contains("T over 3 closes"));
        assert!(text.contains("sma(2) 11.50"));
        assert!(text.contains("340 training windows"));
        assert!(text.contains(" 2: 13.25"));
    }
}
