/*!
The forecasting LSTM: two stacked LSTM layers with dropout, followed by two dense layers
*/

use crate::data::window::{widen, WindowSet};
use crate::{CpuFloat, Error, GpuFloat, Result};
use tch::data::Iter2;
use tch::nn::{self, Linear, ModuleT, OptimizerConfig, RNNConfig, VarStore, LSTM, RNN};
use tch::{Device, Kind, Reduction, Tensor};
use tracing::{debug, info};

/// A sequence regressor mapping a window of scaled prices to the scaled price that follows it
#[derive(Debug)]
pub struct ForecastModel {
    /// The first LSTM layer, whose whole output sequence feeds the second
    pub lstm_seq: LSTM,
    /// The second LSTM layer, of which only the final output is kept
    pub lstm_last: LSTM,
    /// The hidden dense layer
    pub dense: Linear,
    /// The output layer, producing one scalar
    pub output: Linear,
    /// Dropout rate applied after each LSTM layer while training
    pub dropout: f64,
}

impl ModuleT for ForecastModel {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let (hidden, _) = self.lstm_seq.seq(xs);
        let hidden = hidden.dropout(self.dropout, train);
        let (hidden, _) = self.lstm_last.seq(&hidden);
        hidden
            .select(1, -1)
            .dropout(self.dropout, train)
            .apply(&self.dense)
            .apply(&self.output)
    }
}

/// A descriptor for an instance of the forecasting model
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastModelDesc {
    /// The width of both LSTM layers
    pub hidden: usize,
    /// The width of the hidden dense layer
    pub dense: usize,
    /// The dropout rate after each LSTM layer
    pub dropout: f64,
}

impl Default for ForecastModelDesc {
    fn default() -> Self {
        ForecastModelDesc {
            hidden: 50,
            dense: 25,
            dropout: 0.2,
        }
    }
}

impl ForecastModelDesc {
    /// Build a `ForecastModel` over a given `VarStore`
    pub fn build(&self, vs: &VarStore) -> ForecastModel {
        let root = vs.root();
        let config = || RNNConfig {
            batch_first: true,
            ..Default::default()
        };
        let hidden = self.hidden as i64;
        ForecastModel {
            lstm_seq: nn::lstm(&root / "lstm_seq", 1, hidden, config()),
            lstm_last: nn::lstm(&root / "lstm_last", hidden, hidden, config()),
            dense: nn::linear(&root / "dense", hidden, self.dense as i64, Default::default()),
            output: nn::linear(&root / "output", self.dense as i64, 1, Default::default()),
            dropout: self.dropout,
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Full passes over the training windows
    pub epochs: usize,
    /// Windows per gradient step. The final batch of an epoch may be smaller.
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
        }
    }
}

/// What happened during training
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// The number of windows trained on
    pub windows: usize,
    /// Mean batch loss for each epoch, in order
    pub epoch_losses: Vec<CpuFloat>,
}

impl TrainReport {
    /// The mean loss of the last epoch, if any epochs ran
    pub fn final_loss(&self) -> Option<CpuFloat> {
        self.epoch_losses.last().copied()
    }
}

/// A model together with the variables backing it
#[derive(Debug)]
pub struct Forecaster {
    vs: VarStore,
    model: ForecastModel,
    device: Device,
}

impl Forecaster {
    /// Build an untrained model on `device`. With a seed, initialization and training are repeatable.
    pub fn new(desc: &ForecastModelDesc, device: Device, seed: Option<i64>) -> Forecaster {
        if let Some(seed) = seed {
            tch::manual_seed(seed);
        }
        let vs = VarStore::new(device);
        let model = desc.build(&vs);
        Forecaster { vs, model, device }
    }
    /// The device this model lives on
    pub fn device(&self) -> Device {
        self.device
    }
    /// The total number of trainable weights
    pub fn parameter_count(&self) -> usize {
        self.vs
            .trainable_variables()
            .iter()
            .map(|var| var.numel())
            .sum()
    }
    /// Stack windows into a `[windows, window_size, 1]` input tensor on this model's device
    fn inputs(&self, set: &WindowSet) -> Tensor {
        Tensor::from_slice(set.inputs())
            .view([set.len() as i64, set.window_size() as i64, 1])
            .to_device(self.device)
    }
    /// Train on every window in `set`
    pub fn fit(&mut self, set: &WindowSet, config: &TrainConfig) -> Result<TrainReport> {
        self.fit_with(set, config, |_, _| {})
    }
    /// Train on every window in `set`, calling `on_epoch` with the epoch index and mean loss after each epoch.
    ///
    /// Batches are shuffled every epoch. There is no early stopping.
    pub fn fit_with<C>(
        &mut self,
        set: &WindowSet,
        config: &TrainConfig,
        mut on_epoch: C,
    ) -> Result<TrainReport>
    where
        C: FnMut(usize, CpuFloat),
    {
        if set.is_empty() {
            return Err(Error::InsufficientHistory {
                available: 0,
                required: 1,
            });
        }
        if config.batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }
        let xs = Tensor::from_slice(set.inputs()).view([
            set.len() as i64,
            set.window_size() as i64,
            1,
        ]);
        let ys = Tensor::from_slice(set.targets()).view([set.len() as i64, 1]);
        let mut opt = nn::Adam::default().build(&self.vs, config.learning_rate)?;
        debug!(
            windows = set.len(),
            parameters = self.parameter_count(),
            "training forecast model"
        );

        let mut epoch_losses = Vec::with_capacity(config.epochs);
        for epoch in 0..config.epochs {
            let mut batches = Iter2::new(&xs, &ys, config.batch_size as i64);
            batches
                .shuffle()
                .to_device(self.device)
                .return_smaller_last_batch();
            let mut batch = 0usize;
            let mut sum_loss = 0.0;
            for (input_batch, target_batch) in &mut batches {
                let loss = self
                    .model
                    .forward_t(&input_batch, true)
                    .mse_loss(&target_batch, Reduction::Mean);
                opt.backward_step(&loss);
                sum_loss += loss.double_value(&[]);
                batch += 1;
            }
            let loss = sum_loss / batch.max(1) as CpuFloat;
            debug!(epoch, loss, "epoch finished");
            on_epoch(epoch, loss);
            epoch_losses.push(loss);
        }

        let report = TrainReport {
            windows: set.len(),
            epoch_losses,
        };
        info!(
            windows = report.windows,
            epochs = config.epochs,
            loss = report.final_loss().unwrap_or(CpuFloat::NAN),
            "training finished"
        );
        Ok(report)
    }
    /// Predict the scaled value following each window in `set`, one per window, in order
    pub fn predict(&self, set: &WindowSet) -> Result<Vec<CpuFloat>> {
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let xs = self.inputs(set);
        let predictions = tch::no_grad(|| self.model.forward_t(&xs, false))
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .view([-1]);
        let predictions = Vec::<GpuFloat>::try_from(&predictions)?;
        Ok(widen(&predictions))
    }
}
