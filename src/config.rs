/*!
Runtime configuration: defaults, overridden by `STOCKCAST_*` environment variables, overridden by command line flags
*/
use crate::data::fake::FakeSource;
use crate::data::offline::CsvSource;
use crate::data::yahoo::{YahooClient, YAHOO_BASE_URL};
use crate::data::MarketData;
use crate::service::ForecastConfig;
use crate::{Error, Result};
use chrono::{FixedOffset, Utc};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tch::Device;

/// Where market data comes from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SourceKind {
    /// The Yahoo Finance chart API
    Yahoo,
    /// A directory of `<TICKER>.csv` files
    Csv,
    /// Seeded random walks
    Fake,
}

impl FromStr for SourceKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<SourceKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "csv" => Ok(SourceKind::Csv),
            "fake" => Ok(SourceKind::Fake),
            other => Err(Error::InvalidArgument(format!(
                "unknown source {:?}, expected yahoo, csv or fake",
                other
            ))),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SourceKind::Yahoo => write!(f, "yahoo"),
            SourceKind::Csv => write!(f, "csv"),
            SourceKind::Fake => write!(f, "fake"),
        }
    }
}

/// Parse a device name: `cpu`, `cuda`, or `auto` for CUDA when available
pub fn parse_device(s: &str) -> Result<Device> {
    match s.trim().to_ascii_lowercase().as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda(0)),
        "auto" => Ok(Device::cuda_if_available()),
        other => Err(Error::InvalidArgument(format!(
            "invalid device {:?}, expected cpu, cuda or auto",
            other
        ))),
    }
}

/// Market data settings
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Which provider to use
    pub kind: SourceKind,
    /// Yahoo API root
    pub yahoo_url: String,
    /// Request timeout in seconds; none by default
    pub timeout_secs: Option<u64>,
    /// Directory for the CSV source
    pub data_dir: PathBuf,
    /// Seed for the fake source
    pub fake_seed: u64,
}

/// All runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP API binds to
    pub addr: String,
    /// Market data settings
    pub source: SourceConfig,
    /// Forecast pipeline settings
    pub forecast: ForecastConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: "127.0.0.1:8000".to_string(),
            source: SourceConfig {
                kind: SourceKind::Yahoo,
                yahoo_url: YAHOO_BASE_URL.to_string(),
                timeout_secs: None,
                data_dir: PathBuf::from("data"),
                fake_seed: 0,
            },
            forecast: ForecastConfig::default(),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| Error::InvalidArgument(format!("{}: {}", name, err)))
}

impl Config {
    /// Defaults overridden by the process environment, validated
    pub fn from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply every `STOCKCAST_*` variable that `lookup` finds. Blank values are ignored.
    pub fn apply_env_overrides<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("STOCKCAST_ADDR") {
            self.addr = value;
        }
        if let Some(value) = get("STOCKCAST_SOURCE") {
            self.source.kind = value.parse()?;
        }
        if let Some(value) = get("STOCKCAST_YAHOO_URL") {
            self.source.yahoo_url = value;
        }
        if let Some(value) = get("STOCKCAST_TIMEOUT_SECS") {
            self.source.timeout_secs = Some(parse("STOCKCAST_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = get("STOCKCAST_DATA_DIR") {
            self.source.data_dir = PathBuf::from(value);
        }
        if let Some(value) = get("STOCKCAST_FAKE_SEED") {
            self.source.fake_seed = parse("STOCKCAST_FAKE_SEED", &value)?;
        }
        if let Some(value) = get("STOCKCAST_DEVICE") {
            self.forecast.device = parse_device(&value)?;
        }
        if let Some(value) = get("STOCKCAST_SEED") {
            self.forecast.seed = Some(parse("STOCKCAST_SEED", &value)?);
        }
        if let Some(value) = get("STOCKCAST_EPOCHS") {
            self.forecast.train.epochs = parse("STOCKCAST_EPOCHS", &value)?;
        }
        if let Some(value) = get("STOCKCAST_BATCH_SIZE") {
            self.forecast.train.batch_size = parse("STOCKCAST_BATCH_SIZE", &value)?;
        }
        if let Some(value) = get("STOCKCAST_WINDOW") {
            self.forecast.window_size = parse("STOCKCAST_WINDOW", &value)?;
        }
        if let Some(value) = get("STOCKCAST_HORIZON") {
            self.forecast.horizon = parse("STOCKCAST_HORIZON", &value)?;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let forecast = &self.forecast;
        if forecast.train.epochs == 0 {
            return Err(Error::InvalidArgument("epochs must be positive".into()));
        }
        if forecast.train.batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }
        if forecast.window_size == 0 {
            return Err(Error::InvalidArgument("window size must be positive".into()));
        }
        if forecast.horizon == 0 {
            return Err(Error::InvalidArgument("horizon must be positive".into()));
        }
        if !(forecast.train.learning_rate > 0.0) {
            return Err(Error::InvalidArgument("learning rate must be positive".into()));
        }
        if !(0.0..1.0).contains(&forecast.model.dropout) {
            return Err(Error::InvalidArgument("dropout must be in [0, 1)".into()));
        }
        if self.source.kind == SourceKind::Yahoo && self.source.yahoo_url.trim().is_empty() {
            return Err(Error::InvalidArgument("yahoo url must be set".into()));
        }
        Ok(())
    }

    /// Build the configured market data source
    pub fn market_data(&self) -> Result<Box<dyn MarketData + Send + Sync>> {
        Ok(match self.source.kind {
            SourceKind::Yahoo => Box::new(YahooClient::new(
                self.source.yahoo_url.clone(),
                self.source.timeout_secs.map(Duration::from_secs),
            )?),
            SourceKind::Csv => Box::new(CsvSource::new(self.source.data_dir.clone())),
            SourceKind::Fake => {
                let utc = FixedOffset::east_opt(0)
                    .ok_or_else(|| Error::InvalidArgument("utc offset".into()))?;
                Box::new(FakeSource::new(
                    self.source.fake_seed,
                    Utc::now().with_timezone(&utc),
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_pipeline() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.forecast.window_size, 60);
        assert_eq!(config.forecast.horizon, 10);
        assert_eq!(config.forecast.train.epochs, 10);
        assert_eq!(config.forecast.train.batch_size, 32);
        assert_eq!(config.source.timeout_secs, None);
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[
                ("STOCKCAST_ADDR", "0.0.0.0:9000"),
                ("STOCKCAST_SOURCE", "Fake"),
                ("STOCKCAST_EPOCHS", "3"),
                ("STOCKCAST_SEED", "42"),
                ("STOCKCAST_TIMEOUT_SECS", "  "),
            ]))
            .unwrap();
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.source.kind, SourceKind::Fake);
        assert_eq!(config.forecast.train.epochs, 3);
        assert_eq!(config.forecast.seed, Some(42));
        assert_eq!(config.source.timeout_secs, None);
    }

    #[test]
    fn invalid_values() {
        let mut config = Config::default();
        assert!(config
            .apply_env_overrides(lookup(&[("STOCKCAST_EPOCHS", "ten")]))
            .is_err());
        assert!(config
            .apply_env_overrides(lookup(&[("STOCKCAST_DEVICE", "tpu")]))
            .is_err());
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[("STOCKCAST_HORIZON", "0")]))
            .unwrap();
        assert!(config.validate().is_err());
    }
}
