/*!
Forecast near-future stock closing prices with a small LSTM, written in Rust using PyTorch bindings.

Prices come from the [Yahoo Finance](https://finance.yahoo.com/) chart API (or an offline CSV directory, or a
seeded random walk), are min-max scaled into fixed-length windows, and fed to a freshly trained two layer LSTM.
The pipeline is exposed both as an HTTP API (see [`server`]) and as a local command line run.
*/
#![forbid(missing_docs)]

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod lstm;
pub mod report;
pub mod server;
pub mod service;
pub mod util;

pub use error::{Error, Result};

/// The floating point type to be used for CPU calculations
pub type CpuFloat = f64;

/// The floating point type to be used for GPU calculations
pub type GpuFloat = f32;
