/*!
Sliding windows over a scaled series
*/
use crate::{CpuFloat, Error, GpuFloat, Result};
use num::NumCast;

/// The default number of past values in a window
pub const DEFAULT_WINDOW: usize = 60;

/// A set of fixed-length input windows with one target per window, stored flat and row-major.
///
/// Window `i` is `inputs[i * window_size..(i + 1) * window_size]` and its target is `targets[i]`. Windows are in
/// chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    window_size: usize,
    inputs: Vec<GpuFloat>,
    targets: Vec<GpuFloat>,
}

impl WindowSet {
    /// The length of every window in this set
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }
    /// The number of windows in this set
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }
    /// Whether this set has no windows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
    /// Get window `i`
    pub fn window(&self, i: usize) -> Option<&[GpuFloat]> {
        let start = i.checked_mul(self.window_size)?;
        self.inputs.get(start..start.checked_add(self.window_size)?)
    }
    /// Iterate over the windows, oldest first
    pub fn windows(&self) -> impl Iterator<Item = &[GpuFloat]> {
        self.inputs.chunks_exact(self.window_size)
    }
    /// All inputs, flattened
    #[inline]
    pub fn inputs(&self) -> &[GpuFloat] {
        &self.inputs
    }
    /// The target following each window
    #[inline]
    pub fn targets(&self) -> &[GpuFloat] {
        &self.targets
    }
    /// The last `n` windows (all of them if there are fewer than `n`), in order
    pub fn tail(&self, n: usize) -> WindowSet {
        let skip = self.len().saturating_sub(n);
        WindowSet {
            window_size: self.window_size,
            inputs: self.inputs[skip * self.window_size..].to_vec(),
            targets: self.targets[skip..].to_vec(),
        }
    }
}

/// Cut a scaled series into windows of `window_size` values, each paired with the value right after it.
///
/// Produces `values.len() - window_size` windows; fails with `InsufficientHistory` unless
/// `values.len() > window_size`.
pub fn window<F: Copy + NumCast>(values: &[F], window_size: usize) -> Result<WindowSet> {
    if window_size == 0 {
        return Err(Error::InvalidArgument("window size must be positive".into()));
    }
    if values.len() <= window_size {
        return Err(Error::InsufficientHistory {
            available: values.len(),
            required: window_size + 1,
        });
    }
    let values: Vec<GpuFloat> = values
        .iter()
        .map(|&value| NumCast::from(value).unwrap_or(GpuFloat::NAN))
        .collect();
    let n = values.len() - window_size;
    let mut inputs = Vec::with_capacity(n * window_size);
    let mut targets = Vec::with_capacity(n);
    for i in window_size..values.len() {
        inputs.extend_from_slice(&values[i - window_size..i]);
        targets.push(values[i]);
    }
    Ok(WindowSet {
        window_size,
        inputs,
        targets,
    })
}

/// Widen a slice of model outputs back to CPU precision
pub fn widen(values: &[GpuFloat]) -> Vec<CpuFloat> {
    values.iter().map(|&value| <CpuFloat as From<GpuFloat>>::from(value)).collect()
}
