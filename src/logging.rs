/*!
Log setup for the `stockcast` binary
*/
use tracing_subscriber::EnvFilter;

/// How log lines are written
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogFormat {
    /// Human readable lines
    Plain,
    /// One JSON object per line
    Json,
}

/// The log settings found in the environment
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// An `EnvFilter` directive string
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl LogSettings {
    /// Read `STOCKCAST_LOG` (falling back to `RUST_LOG`, then `info`) and `STOCKCAST_LOG_FORMAT` through `lookup`
    pub fn from_lookup<L>(lookup: L) -> LogSettings
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let filter = get("STOCKCAST_LOG")
            .or_else(|| get("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());
        let format = match get("STOCKCAST_LOG_FORMAT") {
            Some(format) if format.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        };
        LogSettings { filter, format }
    }
}

/// Install the global `tracing` subscriber, writing to stderr. Calling this twice is harmless.
pub fn init() {
    let settings = LogSettings::from_lookup(|name| std::env::var(name).ok());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.filter))
        .with_writer(std::io::stderr)
        .with_target(false);

    // a subscriber is already installed on a second call
    let _ = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn defaults() {
        assert_eq!(
            settings(&[]),
            LogSettings {
                filter: "info".into(),
                format: LogFormat::Plain
            }
        );
    }

    #[test]
    fn own_variable_wins() {
        let s = settings(&[
            ("STOCKCAST_LOG", "stockcast=debug"),
            ("RUST_LOG", "warn"),
            ("STOCKCAST_LOG_FORMAT", "JSON"),
        ]);
        assert_eq!(s.filter, "stockcast=debug");
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(settings(&[("STOCKCAST_LOG", " "), ("RUST_LOG", "warn")]).filter, "warn");
    }
}
