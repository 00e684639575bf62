//! The internal price feed: concurrent multi-exchange fetch and
//! volume-weighted aggregation.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use oracle_shared::{OracleError, PriceFeedSymbol, Result};

/// Per-exchange fetch timeout.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// One exchange's contribution to the aggregate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ExchangePrice {
    pub exchange: &'static str,
    pub price: f64,
    pub volume: f64,
}

/// The aggregated price feed returned as the attestation response body.
#[derive(Debug, Clone, Serialize)]
pub struct PriceFeedResult {
    pub symbol: String,
    /// Volume-weighted average price, shortest round-trip rendering.
    pub price: String,
    pub volume: f64,
    pub exchange_count: usize,
    pub timestamp: u64,
    pub exchange_prices: Vec<ExchangePrice>,
}

type ParseFn = fn(&Value) -> Result<(f64, f64)>;

/// Static description of one exchange endpoint.
struct Exchange {
    name: &'static str,
    url: fn(PriceFeedSymbol) -> String,
    parse: ParseFn,
}

const BTC_ETH_EXCHANGES: &[Exchange] = &[
    Exchange {
        name: "binance",
        url: |s| format!("https://api.binance.com/api/v3/ticker/24hr?symbol={}USDT", s.as_str()),
        parse: parse_binance,
    },
    Exchange {
        name: "bybit",
        url: |s| {
            format!(
                "https://api.bybit.com/v5/market/tickers?category=spot&symbol={}USDT",
                s.as_str()
            )
        },
        parse: parse_bybit,
    },
    Exchange {
        name: "coinbase",
        url: |s| format!("https://api.exchange.coinbase.com/products/{}-USD/ticker", s.as_str()),
        parse: parse_coinbase,
    },
    Exchange {
        name: "crypto.com",
        url: |s| {
            format!(
                "https://api.crypto.com/exchange/v1/public/get-tickers?instrument_name={}_USDT",
                s.as_str()
            )
        },
        parse: parse_cryptocom,
    },
];

const ALEO_EXCHANGES: &[Exchange] = &[
    Exchange {
        name: "xt",
        url: |s| {
            format!(
                "https://sapi.xt.com/v4/public/ticker?symbol={}_usdt",
                s.as_str().to_ascii_lowercase()
            )
        },
        parse: parse_xt,
    },
    Exchange {
        name: "gate.io",
        url: |s| {
            format!(
                "https://api.gateio.ws/api/v4/spot/tickers?currency_pair={}_USDT",
                s.as_str()
            )
        },
        parse: parse_gateio,
    },
    Exchange {
        name: "coinbase",
        url: |s| format!("https://api.exchange.coinbase.com/products/{}-USD/ticker", s.as_str()),
        parse: parse_coinbase,
    },
    Exchange {
        name: "mexc",
        url: |s| format!("https://api.mexc.com/api/v3/ticker/24hr?symbol={}USDT", s.as_str()),
        parse: parse_mexc,
    },
];

fn exchanges_for(symbol: PriceFeedSymbol) -> &'static [Exchange] {
    match symbol {
        PriceFeedSymbol::Btc | PriceFeedSymbol::Eth => BTC_ETH_EXCHANGES,
        PriceFeedSymbol::Aleo => ALEO_EXCHANGES,
    }
}

/// Fetch `symbol` from every configured exchange concurrently and
/// aggregate the usable answers.
///
/// Individual exchange failures are logged and skipped; only the final
/// aggregation can fail, when fewer than two exchanges contributed.
pub async fn fetch_price(
    client: &reqwest::Client,
    symbol: PriceFeedSymbol,
    timestamp: u64,
) -> Result<PriceFeedResult> {
    let exchanges = exchanges_for(symbol);
    let (sender, receiver) = flume::bounded(exchanges.len());
    for exchange in exchanges {
        let client = client.clone();
        let sender = sender.clone();
        tokio::spawn(async move {
            let result = fetch_exchange(&client, exchange, symbol).await;
            let _ = sender.send_async((exchange.name, result)).await;
        });
    }
    drop(sender);

    let mut prices = Vec::with_capacity(exchanges.len());
    for _ in 0..exchanges.len() {
        let Ok((name, result)) = receiver.recv_async().await else {
            break;
        };
        match result {
            Ok((price, volume)) if participates(price, volume) => {
                prices.push(ExchangePrice {
                    exchange: name,
                    price,
                    volume,
                });
            }
            Ok((price, volume)) => {
                tracing::warn!("Skipping {name}: non-positive price feed data ({price}, {volume})");
            }
            Err(e) => {
                tracing::warn!("Skipping {name}: {e}");
            }
        }
    }
    aggregate(symbol, prices, timestamp)
}

/// Only strictly positive prices and volumes enter the aggregate.
fn participates(price: f64, volume: f64) -> bool {
    price > 0.0 && volume > 0.0
}

/// Volume-weighted average over the participating exchanges.
pub(crate) fn aggregate(
    symbol: PriceFeedSymbol,
    prices: Vec<ExchangePrice>,
    timestamp: u64,
) -> Result<PriceFeedResult> {
    if prices.len() < 2 {
        return Err(OracleError::InsufficientExchangeData);
    }
    let weighted: f64 = prices.iter().map(|p| p.price * p.volume).sum();
    let volume: f64 = prices.iter().map(|p| p.volume).sum();
    let vwap = weighted / volume;
    Ok(PriceFeedResult {
        symbol: symbol.as_str().to_string(),
        price: vwap.to_string(),
        volume,
        exchange_count: prices.len(),
        timestamp,
        exchange_prices: prices,
    })
}

async fn fetch_exchange(
    client: &reqwest::Client,
    exchange: &Exchange,
    symbol: PriceFeedSymbol,
) -> Result<(f64, f64)> {
    let url = (exchange.url)(symbol);
    let response = tokio::time::timeout(EXCHANGE_TIMEOUT, client.get(&url).send())
        .await
        .map_err(|_| OracleError::ExchangeFetch {
            exchange: exchange.name,
            status: None,
        })?
        .map_err(|e| OracleError::ExchangeFetch {
            exchange: exchange.name,
            status: e.status().map(|s| s.as_u16()),
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(OracleError::ExchangeFetch {
            exchange: exchange.name,
            status: Some(status.as_u16()),
        });
    }
    let body: Value = response
        .json()
        .await
        .map_err(|_| OracleError::InvalidExchangeFormat(exchange.name))?;
    (exchange.parse)(&body)
}

/// A price or volume field: numbers as-is, numeric strings parsed.
fn number(exchange: &'static str, node: Option<&Value>) -> Result<f64> {
    let node = node.ok_or(OracleError::InvalidExchangeFormat(exchange))?;
    match node {
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| OracleError::ExchangeParseFailed(exchange)),
        Value::Number(n) => n
            .as_f64()
            .ok_or(OracleError::ExchangeParseFailed(exchange)),
        _ => Err(OracleError::InvalidExchangeFormat(exchange)),
    }
}

fn parse_binance(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("binance", v.pointer("/lastPrice"))?,
        number("binance", v.pointer("/volume"))?,
    ))
}

fn parse_bybit(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("bybit", v.pointer("/result/list/0/lastPrice"))?,
        number("bybit", v.pointer("/result/list/0/volume24h"))?,
    ))
}

fn parse_coinbase(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("coinbase", v.pointer("/price"))?,
        number("coinbase", v.pointer("/volume"))?,
    ))
}

fn parse_cryptocom(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("crypto.com", v.pointer("/result/data/0/k"))?,
        number("crypto.com", v.pointer("/result/data/0/v"))?,
    ))
}

fn parse_xt(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("xt", v.pointer("/result/0/c"))?,
        number("xt", v.pointer("/result/0/v"))?,
    ))
}

fn parse_gateio(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("gate.io", v.pointer("/0/last"))?,
        number("gate.io", v.pointer("/0/quote_volume"))?,
    ))
}

fn parse_mexc(v: &Value) -> Result<(f64, f64)> {
    Ok((
        number("mexc", v.pointer("/lastPrice"))?,
        number("mexc", v.pointer("/volume"))?,
    ))
}
