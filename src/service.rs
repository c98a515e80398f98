/*!
The forecasting pipeline: fetch, scale, window, train, predict, unscale
*/
use crate::data::scale::{denormalize, normalize};
use crate::data::window::{window, DEFAULT_WINDOW};
use crate::data::{Candle, Interval, MarketData, Period, PriceSeries};
use crate::lstm::{ForecastModelDesc, Forecaster, TrainConfig};
use crate::{CpuFloat, Error, Result};
use serde::Serialize;
use tch::Device;
use tracing::{debug, info};

/// Everything that shapes a forecast
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// How much history to train on
    pub period: Period,
    /// Spacing of the training history
    pub interval: Interval,
    /// How much history the candlestick view covers
    pub candle_period: Period,
    /// Spacing of the candlestick view
    pub candle_interval: Interval,
    /// Number of past closes the model sees per prediction
    pub window_size: usize,
    /// Number of trailing windows to predict on
    pub horizon: usize,
    /// Training hyperparameters
    pub train: TrainConfig,
    /// Model shape
    pub model: ForecastModelDesc,
    /// Where to train
    pub device: Device,
    /// Seed for weight initialization and batch shuffling
    pub seed: Option<i64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            period: Period::Years(1),
            interval: Interval::Days(1),
            candle_period: Period::Days(7),
            candle_interval: Interval::Hours(1),
            window_size: DEFAULT_WINDOW,
            horizon: 10,
            train: TrainConfig::default(),
            model: ForecastModelDesc::default(),
            device: Device::Cpu,
            seed: None,
        }
    }
}

/// The result of one forecast run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// The ticker forecast
    pub ticker: String,
    /// Predicted closing prices, oldest window first
    pub predictions: Vec<CpuFloat>,
    /// The number of windows the model was trained on
    pub training_windows: usize,
    /// Mean loss over the final training epoch
    pub final_loss: Option<CpuFloat>,
}

/// Runs forecasts against a market data source.
///
/// Every call builds its own scaler and model and drops them before returning: nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ForecastService<S> {
    source: S,
    config: ForecastConfig,
}

impl<S: MarketData> ForecastService<S> {
    /// Create a service over `source`
    pub fn new(source: S, config: ForecastConfig) -> ForecastService<S> {
        ForecastService { source, config }
    }
    /// The configuration in use
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }
    /// The underlying market data source
    pub fn source(&self) -> &S {
        &self.source
    }
    /// The closing prices a forecast for `ticker` would train on
    pub fn history(&self, ticker: &str) -> Result<PriceSeries> {
        self.source
            .closes(ticker, self.config.period, self.config.interval)
    }
    /// Recent candles for `ticker`, for display
    pub fn candlestick(&self, ticker: &str) -> Result<Vec<Candle>> {
        self.source.history(
            ticker,
            self.config.candle_period,
            self.config.candle_interval,
        )
    }
    /// Fetch history for `ticker`, train a fresh model on it, and predict closes for the last `horizon` windows.
    ///
    /// Those windows are part of the training set, so the predictions are in-sample fits rather than genuine
    /// forecasts of unseen days.
    pub fn predict_next(&self, ticker: &str) -> Result<Forecast> {
        let series = self.history(ticker)?;
        self.forecast_series(ticker, &series)
    }
    /// Run the pipeline on an already fetched series
    pub fn forecast_series(&self, ticker: &str, series: &PriceSeries) -> Result<Forecast> {
        self.forecast_series_with(ticker, series, |_, _| {})
    }
    /// Run the pipeline on an already fetched series, reporting each epoch's loss to `on_epoch`
    pub fn forecast_series_with<C>(
        &self,
        ticker: &str,
        series: &PriceSeries,
        on_epoch: C,
    ) -> Result<Forecast>
    where
        C: FnMut(usize, CpuFloat),
    {
        let config = &self.config;
        if series.len() <= config.window_size {
            return Err(Error::InsufficientHistory {
                available: series.len(),
                required: config.window_size + 1,
            });
        }
        let (scaled, scaler) = normalize(&series.closes())?;
        let windows = window(&scaled, config.window_size)?;
        debug!(
            ticker,
            points = series.len(),
            windows = windows.len(),
            min = scaler.min,
            max = scaler.max,
            "prepared training windows"
        );

        let mut forecaster = Forecaster::new(&config.model, config.device, config.seed);
        let report = forecaster.fit_with(&windows, &config.train, on_epoch)?;

        let recent = windows.tail(config.horizon);
        let scaled_predictions = forecaster.predict(&recent)?;
        let predictions = denormalize(&scaled_predictions, &scaler);
        info!(
            ticker,
            predictions = predictions.len(),
            last = predictions.last().copied().unwrap_or(CpuFloat::NAN),
            "forecast complete"
        );
        Ok(Forecast {
            ticker: ticker.to_string(),
            predictions,
            training_windows: report.windows,
            final_loss: report.final_loss(),
        })
    }
}
