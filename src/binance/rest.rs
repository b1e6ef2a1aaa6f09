//! REST client for the Binance USDT-M futures API
//!
//! Plain market/limit orders go through `/fapi/v1/order`; conditional orders
//! (stop-market and trailing-stop) are a separate "algo" order class with
//! their own placement endpoint and their own delete-all path. Both paths
//! must be hit when flattening a symbol's working orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::signed_query;
use super::messages::*;
use crate::common::errors::{Result, StrategyError};
use crate::common::traits::{InstrumentMeta, MarketData, OrderTransport};
use crate::common::types::{Candle, Direction, MarketSpec, OrderAck, PositionSnapshot, Side};

const ORDER_ENDPOINT: &str = "/fapi/v1/order";
const ALGO_ORDER_ENDPOINT: &str = "/fapi/v1/algoOrder";
const OPEN_ORDERS_ENDPOINT: &str = "/fapi/v1/allOpenOrders";
const ALGO_OPEN_ORDERS_ENDPOINT: &str = "/fapi/v1/algoOpenOrders";

/// Exchange error codes that mean "nothing left to cancel"; callers treat
/// these as success
const CODE_UNKNOWN_ORDER: i64 = -2011;
const CODE_NO_OPEN_ALGO_ORDER: i64 = -1200;

/// API credentials for signed endpoints
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }
}

/// REST client for the Binance USDT-M futures API
#[derive(Debug, Clone)]
pub struct BinanceFuturesClient {
    /// HTTP client
    client: Client,
    /// Base URL for the futures API
    base_url: String,
    /// Credentials for signed endpoints
    credentials: Option<ApiCredentials>,
    /// recvWindow for signed requests, milliseconds
    recv_window_ms: u64,
}

impl BinanceFuturesClient {
    /// Create a new REST client (unauthenticated; market data only)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StrategyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
            recv_window_ms: 5000,
        })
    }

    /// Set API credentials for signed requests
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the recvWindow used for signed requests
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    fn credentials(&self) -> Result<&ApiCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| StrategyError::Authentication("API credentials not configured".into()))
    }

    /// Issue a signed request; the query string is signed and sent in the URL
    async fn signed_request(&self, method: Method, path: &str, query: &str) -> Result<String> {
        let creds = self.credentials()?;
        let query = signed_query(&creds.api_secret, query, self.recv_window_ms)?;
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!("signed {} {}", method, path);

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &creds.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_error(status, &body))
        }
    }

    /// Issue an unsigned GET and deserialize the JSON body
    async fn public_get<T: serde::de::DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        Ok(response.json().await?)
    }

    /// Run a cancellation request, translating "nothing to cancel" into success
    async fn cancel_request(&self, path: &str, query: &str) -> Result<()> {
        match self.signed_request(Method::DELETE, path, query).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_gone(&e) => {
                debug!("cancel on {}: nothing to cancel ({})", path, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Map a non-success HTTP response onto the error taxonomy: parameter
/// rejections carry an exchange error code and a 4xx status, everything else
/// is transport-level.
fn classify_error(status: StatusCode, body: &str) -> StrategyError {
    if let Ok(api) = serde_json::from_str::<ApiError>(body) {
        if status.is_client_error() {
            return StrategyError::OrderRejected(format!("code {}: {}", api.code, api.msg));
        }
        return StrategyError::Transport(format!("status {}, code {}: {}", status, api.code, api.msg));
    }
    StrategyError::Transport(format!("status {}: {}", status, body))
}

/// "Order not found / already filled / no open algo orders" responses count
/// as cancellation success, never as failure.
fn is_already_gone(err: &StrategyError) -> bool {
    match err {
        StrategyError::OrderRejected(msg) => {
            msg.contains(&format!("code {}", CODE_UNKNOWN_ORDER))
                || msg.contains(&format!("code {}", CODE_NO_OPEN_ALGO_ORDER))
                || msg.contains("Unknown order")
                || msg.contains("No open algo order")
        }
        _ => false,
    }
}

#[async_trait]
impl MarketData for BinanceFuturesClient {
    #[instrument(skip(self))]
    async fn get_ticker(&self, symbol: &str) -> Result<Decimal> {
        let query = format!("symbol={}", symbol);
        let ticker: PriceTickerResponse = self
            .public_get("/fapi/v1/ticker/price", &query)
            .await?;
        parse_decimal(&ticker.price, "price")
    }

    #[instrument(skip(self))]
    async fn get_position(
        &self,
        symbol: &str,
        direction: Direction,
    ) -> Result<Option<PositionSnapshot>> {
        let query = format!("symbol={}", symbol);
        let body = self
            .signed_request(Method::GET, "/fapi/v2/positionRisk", &query)
            .await?;
        let positions: Vec<PositionRiskResponse> = serde_json::from_str(&body)?;

        for p in &positions {
            let amount = parse_decimal(&p.position_amt, "positionAmt")?;
            let matches = match (direction, p.position_side.as_str()) {
                (Direction::Long, "LONG") => amount > Decimal::ZERO,
                (Direction::Short, "SHORT") => amount < Decimal::ZERO,
                // one-way position mode reports side BOTH with a signed amount
                (Direction::Long, "BOTH") => amount > Decimal::ZERO,
                (Direction::Short, "BOTH") => amount < Decimal::ZERO,
                _ => false,
            };
            if matches {
                return Ok(Some(PositionSnapshot {
                    amount: amount.abs(),
                    avg_price: parse_decimal(&p.entry_price, "entryPrice")?,
                }));
            }
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    async fn get_daily_candles(&self, symbol: &str, count: usize) -> Result<Vec<Candle>> {
        let query = format!("symbol={}&interval=1d&limit={}", symbol, count);
        let rows: Vec<RawKline> = self.public_get("/fapi/v1/klines", &query).await?;

        rows.iter()
            .map(|k| {
                let open_time = DateTime::<Utc>::from_timestamp_millis(k.0).ok_or_else(|| {
                    StrategyError::InvalidResponse(format!("Invalid kline timestamp: {}", k.0))
                })?;
                Ok(Candle {
                    open_time,
                    open: parse_decimal(&k.1, "open")?,
                    high: parse_decimal(&k.2, "high")?,
                    low: parse_decimal(&k.3, "low")?,
                    close: parse_decimal(&k.4, "close")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl OrderTransport for BinanceFuturesClient {
    #[instrument(skip(self))]
    async fn submit_market(&self, symbol: &str, side: Side, qty: Decimal) -> Result<OrderAck> {
        let query = format!("symbol={}&side={}&type=MARKET&quantity={}", symbol, side, qty);
        let body = self.signed_request(Method::POST, ORDER_ENDPOINT, &query).await?;
        let resp: OrderResponse = serde_json::from_str(&body)?;
        Ok(OrderAck { order_id: resp.id() })
    }

    #[instrument(skip(self))]
    async fn submit_limit(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        let mut query = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=GTC&quantity={}&price={}",
            symbol, side, qty, price
        );
        if reduce_only {
            query.push_str("&reduceOnly=true");
        }
        let body = self.signed_request(Method::POST, ORDER_ENDPOINT, &query).await?;
        let resp: OrderResponse = serde_json::from_str(&body)?;
        Ok(OrderAck { order_id: resp.id() })
    }

    #[instrument(skip(self))]
    async fn submit_stop_market(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        trigger_price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        let mut query = format!(
            "algoType=CONDITIONAL&symbol={}&side={}&type=STOP_MARKET&quantity={}&triggerPrice={}&workingType=CONTRACT_PRICE",
            symbol, side, qty, trigger_price
        );
        if reduce_only {
            query.push_str("&reduceOnly=true");
        }
        let body = self
            .signed_request(Method::POST, ALGO_ORDER_ENDPOINT, &query)
            .await?;
        let resp: OrderResponse = serde_json::from_str(&body)?;
        Ok(OrderAck { order_id: resp.id() })
    }

    #[instrument(skip(self))]
    async fn submit_trailing_stop(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        callback_rate_pct: Decimal,
        activation_price: Option<Decimal>,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        let mut query = format!(
            "algoType=CONDITIONAL&symbol={}&side={}&type=TRAILING_STOP_MARKET&quantity={}&callbackRate={}",
            symbol, side, qty, callback_rate_pct
        );
        if let Some(activation) = activation_price {
            query.push_str(&format!("&activatePrice={}", activation));
        }
        if reduce_only {
            query.push_str("&reduceOnly=true");
        }
        let body = self
            .signed_request(Method::POST, ALGO_ORDER_ENDPOINT, &query)
            .await?;
        let resp: OrderResponse = serde_json::from_str(&body)?;
        Ok(OrderAck { order_id: resp.id() })
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<()> {
        let query = format!("symbol={}&orderId={}", symbol, order_id);
        self.cancel_request(ORDER_ENDPOINT, &query).await
    }

    #[instrument(skip(self))]
    async fn cancel_open_orders(&self, symbol: &str) -> Result<()> {
        let query = format!("symbol={}", symbol);
        self.cancel_request(OPEN_ORDERS_ENDPOINT, &query).await
    }

    #[instrument(skip(self))]
    async fn cancel_algo_orders(&self, symbol: &str) -> Result<()> {
        let query = format!("symbol={}", symbol);
        self.cancel_request(ALGO_OPEN_ORDERS_ENDPOINT, &query).await
    }
}

#[async_trait]
impl InstrumentMeta for BinanceFuturesClient {
    #[instrument(skip(self))]
    async fn get_market_spec(&self, symbol: &str) -> Result<MarketSpec> {
        let info: ExchangeInfoResponse = self.public_get("/fapi/v1/exchangeInfo", "").await?;
        let entry = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| StrategyError::PrecisionUnavailable(symbol.to_string()))?;

        let mut min_amount = None;
        let mut tick_size = None;
        for filter in &entry.filters {
            match filter.filter_type.as_str() {
                "LOT_SIZE" => {
                    if let Some(min_qty) = &filter.min_qty {
                        min_amount = Some(parse_decimal(min_qty, "minQty")?);
                    }
                }
                "PRICE_FILTER" => {
                    if let Some(tick) = &filter.tick_size {
                        tick_size = Some(parse_decimal(tick, "tickSize")?);
                    }
                }
                _ => {}
            }
        }

        Ok(MarketSpec {
            price_precision: entry.price_precision,
            amount_precision: entry.quantity_precision,
            min_amount: min_amount
                .ok_or_else(|| StrategyError::PrecisionUnavailable(symbol.to_string()))?,
            tick_size: tick_size
                .ok_or_else(|| StrategyError::PrecisionUnavailable(symbol.to_string()))?,
        })
    }
}
