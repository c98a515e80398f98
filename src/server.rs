/*!
The HTTP API: thin handlers over a [`ForecastService`], with CORS open to every origin
*/
use crate::data::{Candle, MarketData};
use crate::service::ForecastService;
use crate::util::pandas_str;
use crate::{Error, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[derive(Serialize)]
struct PredictResponse {
    predictions: Vec<[f64; 1]>,
}

#[derive(Serialize)]
struct StockResponse {
    #[serde(rename = "Close")]
    close: BTreeMap<String, f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CandleRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl From<&Candle> for CandleRow {
    fn from(candle: &Candle) -> Self {
        CandleRow {
            datetime: pandas_str(&candle.t),
            open: candle.o,
            high: candle.h,
            low: candle.l,
            close: candle.c,
        }
    }
}

#[derive(Serialize)]
struct CandlestickResponse {
    ticker: String,
    candlestick: Vec<CandleRow>,
}

/// The HTTP status an error is reported with
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::DataUnavailable { .. } => StatusCode::NOT_FOUND,
        Error::InsufficientHistory { .. }
        | Error::DegenerateSeries(_)
        | Error::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(&err);
    warn!(%status, error = %err, "request failed");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Run `f` against the service on the blocking pool
async fn blocking<S, T, F>(service: Arc<ForecastService<S>>, f: F) -> Result<T>
where
    S: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&ForecastService<S>) -> Result<T> + Send + 'static,
{
    spawn_blocking(move || f(&service)).await?
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn predict<S>(
    State(service): State<Arc<ForecastService<S>>>,
    Path(ticker): Path<String>,
) -> Response
where
    S: MarketData + Send + Sync + 'static,
{
    info!(%ticker, "forecast requested");
    match blocking(service, move |service| service.predict_next(&ticker)).await {
        Ok(forecast) => Json(PredictResponse {
            predictions: forecast.predictions.iter().map(|&p| [p]).collect(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn stock<S>(
    State(service): State<Arc<ForecastService<S>>>,
    Path(ticker): Path<String>,
) -> Response
where
    S: MarketData + Send + Sync + 'static,
{
    match blocking(service, move |service| service.history(&ticker)).await {
        Ok(series) => Json(StockResponse {
            close: series
                .points()
                .iter()
                .map(|point| (point.t.to_rfc3339(), point.c))
                .collect(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn candlestick<S>(
    State(service): State<Arc<ForecastService<S>>>,
    Path(ticker): Path<String>,
) -> Response
where
    S: MarketData + Send + Sync + 'static,
{
    let requested = ticker.clone();
    match blocking(service, move |service| service.candlestick(&requested)).await {
        Ok(candles) => Json(CandlestickResponse {
            ticker,
            candlestick: candles.iter().map(CandleRow::from).collect(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// Build the API routes over `service`
pub fn router<S>(service: Arc<ForecastService<S>>) -> Router
where
    S: MarketData + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/predict/:ticker", get(predict::<S>))
        .route("/stock/:ticker", get(stock::<S>))
        .route("/candlestick/:ticker", get(candlestick::<S>))
        .with_state(service)
        .layer(cors)
}

/// Serve the API on an already bound listener until the server fails
pub async fn serve<S>(listener: TcpListener, service: Arc<ForecastService<S>>) -> Result<()>
where
    S: MarketData + Send + Sync + 'static,
{
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Bind `addr` and serve the API until Ctrl-C
pub async fn run<S>(addr: &str, service: Arc<ForecastService<S>>) -> Result<()>
where
    S: MarketData + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("could not install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_for(&Error::unavailable("X", "gone")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&Error::InsufficientHistory {
                available: 3,
                required: 61
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&Error::Io(std::io::Error::other("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
