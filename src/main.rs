/*!
The `stockcast` command line: serve the HTTP API, run a local forecast, or dump candles to CSV
*/
use anyhow::format_err;
use clap::{value_parser, Arg, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{stdout, Write};
use std::sync::Arc;
use stockcast::config::{parse_device, Config};
use stockcast::data::offline::write_candles;
use stockcast::data::{Interval, MarketData, Period};
use stockcast::report::{histogram, render, SeriesSummary, DEFAULT_BINS};
use stockcast::server;
use stockcast::service::ForecastService;
use tracing::info;

const SMA_PERIOD: usize = 20;

fn cli() -> Command {
    let ticker = Arg::new("TICKER")
        .help("Ticker symbol, e.g. AAPL")
        .required(true);
    let period = Arg::new("period")
        .short('p')
        .long("period")
        .help("How much history to fetch: 7d, 1mo, 1y, ytd, max...");
    let interval = Arg::new("interval")
        .short('i')
        .long("interval")
        .help("Bar spacing: 1m, 1h, 1d, 1wk...");
    Command::new("stockcast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fetches stock prices and forecasts closing prices with an LSTM")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("source")
                .long("source")
                .global(true)
                .help("Market data source: yahoo, csv, fake. Defaults to yahoo"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .help("Directory of <TICKER>.csv files for the csv source"),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .global(true)
                .help("Device to train on: cpu, cuda, auto. Defaults to cpu"),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the forecast HTTP API")
                .arg(
                    Arg::new("addr")
                        .short('a')
                        .long("addr")
                        .help("Address to bind, e.g. 127.0.0.1:8000"),
                ),
        )
        .subcommand(
            Command::new("forecast")
                .about("Summarize a ticker's history and forecast its closes locally")
                .arg(ticker.clone())
                .arg(period.clone())
                .arg(interval.clone())
                .arg(
                    Arg::new("epochs")
                        .short('e')
                        .long("epochs")
                        .value_parser(value_parser!(usize))
                        .help("Training epochs"),
                )
                .arg(
                    Arg::new("seed")
                        .short('s')
                        .long("seed")
                        .value_parser(value_parser!(i64))
                        .help("Seed for repeatable training"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Write a ticker's candles as CSV")
                .arg(ticker)
                .arg(period)
                .arg(interval)
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output file. Defaults to stdout"),
                ),
        )
}

/// Apply the flags shared by every subcommand
fn apply_common(config: &mut Config, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(source) = matches.get_one::<String>("source") {
        config.source.kind = source.parse()?;
    }
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.source.data_dir = dir.into();
    }
    if let Some(device) = matches.get_one::<String>("device") {
        config.forecast.device = parse_device(device)?;
    }
    Ok(())
}

fn period_interval(
    matches: &ArgMatches,
    period: Period,
    interval: Interval,
) -> anyhow::Result<(Period, Interval)> {
    let period = match matches.get_one::<String>("period") {
        Some(period) => period.parse()?,
        None => period,
    };
    let interval = match matches.get_one::<String>("interval") {
        Some(interval) => interval.parse()?,
        None => interval,
    };
    Ok((period, interval))
}

fn serve(config: Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let addr = matches
        .get_one::<String>("addr")
        .cloned()
        .unwrap_or_else(|| config.addr.clone());
    let service = Arc::new(ForecastService::new(
        config.market_data()?,
        config.forecast.clone(),
    ));
    info!(source = %config.source.kind, device = ?config.forecast.device, "starting server");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(server::run(&addr, service.clone()));
    // the blocking HTTP client must be dropped outside the runtime
    drop(runtime);
    drop(service);
    Ok(result?)
}

fn forecast(mut config: Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let ticker = matches
        .get_one::<String>("TICKER")
        .ok_or_else(|| format_err!("a ticker is required"))?;
    let (period, interval) =
        period_interval(matches, config.forecast.period, config.forecast.interval)?;
    config.forecast.period = period;
    config.forecast.interval = interval;
    if let Some(&epochs) = matches.get_one::<usize>("epochs") {
        config.forecast.train.epochs = epochs;
    }
    if let Some(&seed) = matches.get_one::<i64>("seed") {
        config.forecast.seed = Some(seed);
    }
    config.validate()?;

    let service = ForecastService::new(config.market_data()?, config.forecast.clone());
    let series = service.history(ticker)?;
    let summary = SeriesSummary::new(&series, SMA_PERIOD)?;
    let bins = histogram(&series.closes(), DEFAULT_BINS);

    let progress = ProgressBar::new(config.forecast.train.epochs as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("Training: {wide_bar} {pos}/{len} [{msg:15}]")?,
    );
    progress.set_message("no loss");
    let forecast = service.forecast_series_with(ticker, &series, |_, loss| {
        progress.set_message(format!("loss = {:.5}", loss));
        progress.inc(1);
    })?;
    progress.finish_and_clear();

    print!("{}", render(ticker, &summary, &bins, Some(&forecast)));
    Ok(())
}

fn fetch(config: Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let ticker = matches
        .get_one::<String>("TICKER")
        .ok_or_else(|| format_err!("a ticker is required"))?;
    let (period, interval) =
        period_interval(matches, config.forecast.period, config.forecast.interval)?;
    let candles = config.market_data()?.history(ticker, period, interval)?;
    if candles.is_empty() {
        return Err(format_err!("no candles returned for {}", ticker));
    }
    let writer: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(stdout().lock()),
    };
    let written = write_candles(writer, candles.into_iter())?;
    info!(ticker = %ticker, %period, %interval, written, "wrote candles");
    Ok(())
}

pub fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    stockcast::logging::init();

    let matches = cli().get_matches();
    let mut config = Config::from_env()?;
    match matches.subcommand() {
        Some((name, sub)) => {
            apply_common(&mut config, sub)?;
            config.validate()?;
            match name {
                "serve" => serve(config, sub),
                "forecast" => forecast(config, sub),
                "fetch" => fetch(config, sub),
                other => Err(format_err!("unknown command {:?}", other)),
            }
        }
        None => Err(format_err!("a command is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn forecast_flags() {
        let matches = cli()
            .try_get_matches_from([
                "stockcast", "forecast", "AAPL", "--period", "2y", "--epochs", "3", "--source",
                "fake",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "forecast");
        let mut config = Config::default();
        apply_common(&mut config, sub).unwrap();
        assert_eq!(config.source.kind, stockcast::config::SourceKind::Fake);
        let (period, interval) = period_interval(sub, Period::Years(1), Interval::Days(1)).unwrap();
        assert_eq!(period, Period::Years(2));
        assert_eq!(interval, Interval::Days(1));
        assert_eq!(sub.get_one::<usize>("epochs"), Some(&3));
    }
}
