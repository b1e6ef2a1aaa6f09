//! Trait definitions for the exchange collaborators
//!
//! The strategy core only ever talks to the exchange through these traits,
//! so lifecycle tests can run against a scripted fake instead of the network.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::Result;
use super::types::{Candle, Direction, MarketSpec, OrderAck, PositionSnapshot, Side};

/// Market data and position reads
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last traded price for a symbol
    async fn get_ticker(&self, symbol: &str) -> Result<Decimal>;

    /// Current open position for a symbol/direction, `None` when flat
    async fn get_position(
        &self,
        symbol: &str,
        direction: Direction,
    ) -> Result<Option<PositionSnapshot>>;

    /// Most recent daily candles, ordered oldest to newest.
    /// The final candle is the current, unclosed one.
    async fn get_daily_candles(&self, symbol: &str, count: usize) -> Result<Vec<Candle>>;
}

/// Raw order submission and cancellation.
///
/// Stop and trailing orders are exchange-resident conditional ("algo") orders
/// and live in a separate order class from plain market/limit orders, with a
/// separate cancellation path. Implementations must report exchange-side
/// parameter rejections as `OrderRejected` and network failures as
/// `Transport`; the gateway's retry policy depends on the distinction.
#[async_trait]
pub trait OrderTransport: Send + Sync {
    async fn submit_market(&self, symbol: &str, side: Side, qty: Decimal) -> Result<OrderAck>;

    async fn submit_limit(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck>;

    async fn submit_stop_market(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        trigger_price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck>;

    async fn submit_trailing_stop(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        callback_rate_pct: Decimal,
        activation_price: Option<Decimal>,
        reduce_only: bool,
    ) -> Result<OrderAck>;

    /// Cancel a single resting order. "Unknown order / already filled"
    /// responses count as success.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<()>;

    /// Cancel all resting (market/limit) orders for a symbol
    async fn cancel_open_orders(&self, symbol: &str) -> Result<()>;

    /// Cancel all conditional (stop/trailing) orders for a symbol.
    /// "No open algo orders" counts as success.
    async fn cancel_algo_orders(&self, symbol: &str) -> Result<()>;
}

/// Exchange instrument metadata
#[async_trait]
pub trait InstrumentMeta: Send + Sync {
    /// Rounding rules and minimum size for a symbol; fails with
    /// `PrecisionUnavailable` when the symbol is not listed.
    async fn get_market_spec(&self, symbol: &str) -> Result<MarketSpec>;
}

/// Convenience bound for a full exchange client
pub trait ExchangeApi: MarketData + OrderTransport + InstrumentMeta {}

impl<T: MarketData + OrderTransport + InstrumentMeta> ExchangeApi for T {}
