/*!
Test the Yahoo client against a local chart API
*/
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use stockcast::data::yahoo::YahooClient;
use stockcast::data::{Candle, Interval, MarketData, Period};
use stockcast::{Error, Result};
use tokio::net::TcpListener;

const CHART: &str = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","gmtoffset":-18000},
    "timestamp":[1704205800,1704292200],
    "indicators":{"quote":[{
        "open":[187.15,184.22],"high":[188.44,185.88],"low":[183.89,183.43],
        "close":[185.64,184.25],"volume":[82488700,58414500]}]}}],"error":null}}"#;

const NOT_FOUND: &str = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

async fn chart(Path(ticker): Path<String>) -> Response {
    match ticker.as_str() {
        "AAPL" => (StatusCode::OK, CHART).into_response(),
        "BUSY" => (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response(),
        "DOWN" => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
        _ => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn spawn_chart_api() -> SocketAddr {
    let app = Router::new().route("/v8/finance/chart/:ticker", get(chart));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

/// Fetch daily history on the blocking pool, where the blocking client may live
async fn fetch(addr: SocketAddr, ticker: &'static str) -> Result<Vec<Candle>> {
    tokio::task::spawn_blocking(move || {
        YahooClient::new(format!("http://{}", addr), None)?.history(
            ticker,
            Period::Years(1),
            Interval::Days(1),
        )
    })
    .await
    .expect("Fetch task should not panic")
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_chart() {
    let addr = spawn_chart_api().await;
    let candles = fetch(addr, "AAPL").await.unwrap();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].t.to_rfc3339(), "2024-01-02T00:00:00-05:00");
    assert_eq!(candles[1].c, 184.25);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_ticker_is_unavailable() {
    let addr = spawn_chart_api().await;
    match fetch(addr, "NOPE").await {
        Err(Error::DataUnavailable { ticker, reason }) => {
            assert_eq!(ticker, "NOPE");
            assert!(reason.contains("delisted"), "{}", reason);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_failures_are_not_unavailable() {
    let addr = spawn_chart_api().await;
    for ticker in ["BUSY", "DOWN"] {
        match fetch(addr, ticker).await {
            Err(Error::Provider(err)) => assert!(err.status().is_some(), "{}", err),
            other => panic!("{}: unexpected {:?}", ticker, other),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn path_like_ticker_is_rejected() {
    let addr = spawn_chart_api().await;
    assert!(matches!(
        fetch(addr, "AAPL/../x").await,
        Err(Error::InvalidArgument(_))
    ));
}
