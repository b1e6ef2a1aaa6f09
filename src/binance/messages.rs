//! Wire-format types for the Binance USDT-M futures REST API

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::common::errors::{Result, StrategyError};

/// Parse a decimal carried as a JSON string, naming the field on failure
pub fn parse_decimal(value: &str, field: &str) -> Result<Decimal> {
    value
        .parse()
        .map_err(|e| StrategyError::InvalidResponse(format!("Invalid {}: {}", field, e)))
}

/// Error payload returned by the exchange
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

/// Response from `/fapi/v1/ticker/price`
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTickerResponse {
    pub symbol: String,
    pub price: String,
}

/// One kline row from `/fapi/v1/klines`; the exchange returns each candle as
/// a 12-element array
#[derive(Debug, Clone, Deserialize)]
pub struct RawKline(
    pub i64,    // open time (ms)
    pub String, // open
    pub String, // high
    pub String, // low
    pub String, // close
    pub String, // volume
    pub i64,    // close time (ms)
    pub String, // quote asset volume
    pub i64,    // number of trades
    pub String, // taker buy base volume
    pub String, // taker buy quote volume
    pub String, // unused
);

/// One entry from `/fapi/v2/positionRisk`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRiskResponse {
    pub symbol: String,
    pub position_amt: String,
    pub entry_price: String,
    #[serde(default)]
    pub position_side: String,
}

/// Response from `/fapi/v1/exchangeInfo`
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub price_precision: u32,
    pub quantity_precision: u32,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFilter {
    pub filter_type: String,
    #[serde(default)]
    pub min_qty: Option<String>,
    #[serde(default)]
    pub tick_size: Option<String>,
}

/// Response from order placement; plain orders return `orderId`, conditional
/// orders placed through the algo endpoint return `algoId`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub algo_id: Option<i64>,
}

impl OrderResponse {
    pub fn id(&self) -> Option<String> {
        self.order_id
            .or(self.algo_id)
            .map(|id| id.to_string())
    }
}
