/*!
Error types for `stockcast`
*/
use thiserror::Error;

/// Everything that can go wrong between fetching a ticker and returning a forecast
#[derive(Debug, Error)]
pub enum Error {
    /// The provider had nothing for this ticker, or the ticker does not exist
    #[error("no data available for {ticker}: {reason}")]
    DataUnavailable {
        /// The requested ticker
        ticker: String,
        /// Why the provider came back empty
        reason: String,
    },
    /// The series is too short to build even one window
    #[error("insufficient history: got {available} points, need at least {required}")]
    InsufficientHistory {
        /// Number of points available
        available: usize,
        /// Minimum number of points required
        required: usize,
    },
    /// The series cannot be scaled or ordered (non-finite prices, unordered timestamps)
    #[error("degenerate series: {0}")]
    DegenerateSeries(String),
    /// A caller supplied a value outside its domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Transport or decoding failure talking to the market data provider
    #[error("provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
    /// Failure inside libtorch
    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),
    /// Failure reading or writing CSV data
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Filesystem or socket failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A blocking worker panicked or was cancelled
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Shorthand for a `DataUnavailable` error
    pub fn unavailable(ticker: &str, reason: impl Into<String>) -> Error {
        Error::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type used throughout `stockcast`
pub type Result<T> = std::result::Result<T, Error>;
