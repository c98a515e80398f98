/*!
Input data scaling
*/
use crate::{CpuFloat, Error, Result};
use num::Float;
use std::fmt::Debug;

/// A min-max scaler, mapping the observed minimum to zero and the observed maximum to one.
///
/// A scaler fit to a constant series has `min == max`: every value then scales to zero, and everything unscales to
/// `min`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMaxScaler<F = CpuFloat> {
    /// The smallest value seen when fitting
    pub min: F,
    /// The largest value seen when fitting
    pub max: F,
}

impl<F> MinMaxScaler<F>
where
    F: Copy + Float + Debug,
{
    /// Fit a scaler to a set of values.
    ///
    /// Fails with `InsufficientHistory` if there are no values, and with `DegenerateSeries` if any value is NaN or
    /// infinite.
    pub fn fit(values: &[F]) -> Result<MinMaxScaler<F>> {
        let first = *values.first().ok_or(Error::InsufficientHistory {
            available: 0,
            required: 1,
        })?;
        let mut scaler = MinMaxScaler {
            min: first,
            max: first,
        };
        for &value in values {
            if !value.is_finite() {
                return Err(Error::DegenerateSeries(format!(
                    "cannot scale non-finite value {:?}",
                    value
                )));
            }
            scaler.min = scaler.min.min(value);
            scaler.max = scaler.max.max(value);
        }
        Ok(scaler)
    }
    /// The width of the fitted range
    #[inline]
    pub fn range(&self) -> F {
        self.max - self.min
    }
    /// Scale a value into the unit interval (values outside the fitted range land outside it)
    #[inline]
    pub fn scale(&self, value: F) -> F {
        let range = self.range();
        if range == F::zero() {
            return F::zero();
        }
        (value - self.min) / range
    }
    /// Map a scaled value back to the original units
    #[inline]
    pub fn unscale(&self, value: F) -> F {
        value * self.range() + self.min
    }
}

/// Fit a scaler to `values` and return the scaled values alongside it
pub fn normalize<F>(values: &[F]) -> Result<(Vec<F>, MinMaxScaler<F>)>
where
    F: Copy + Float + Debug,
{
    let scaler = MinMaxScaler::fit(values)?;
    let scaled = values.iter().map(|&value| scaler.scale(value)).collect();
    Ok((scaled, scaler))
}

/// Undo `normalize`
pub fn denormalize<F>(values: &[F], scaler: &MinMaxScaler<F>) -> Vec<F>
where
    F: Copy + Float + Debug,
{
    values.iter().map(|&value| scaler.unscale(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_into_unit_interval() {
        let (scaled, scaler) = normalize(&[10.0, 15.0, 20.0, 12.5]).unwrap();
        assert_eq!(scaler, MinMaxScaler { min: 10.0, max: 20.0 });
        assert_eq!(scaled, vec![0.0, 0.5, 1.0, 0.25]);
    }

    #[test]
    fn roundtrip() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.5 + i as f64 * 0.1)
            .collect();
        let (scaled, scaler) = normalize(&values).unwrap();
        let restored = denormalize(&scaled, &scaler);
        for (a, b) in values.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn constant_series_scales_to_zero() {
        let (scaled, scaler) = normalize(&[42.0f32; 5]).unwrap();
        assert!(scaled.iter().all(|&v| v == 0.0));
        assert_eq!(denormalize(&[0.0, 0.7], &scaler), vec![42.0, 42.0]);
    }

    #[test]
    fn empty_and_nan() {
        assert!(matches!(
            normalize::<f64>(&[]),
            Err(Error::InsufficientHistory { available: 0, .. })
        ));
        assert!(matches!(
            normalize(&[1.0, f64::NAN]),
            Err(Error::DegenerateSeries(_))
        ));
    }
}
