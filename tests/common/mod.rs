//! Shared test fixtures: a scripted in-memory exchange

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Mutex;

use binance_pyramid::{
    AppSettings, Candle, Direction, InstrumentMeta, MarketData, MarketSpec, OrderAck,
    OrderTransport, PositionSnapshot, Result, Side,
};

/// Order classes recorded by the fake exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    StopMarket,
    Trailing,
}

/// One order as the fake exchange received it
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub kind: OrderKind,
    pub side: Side,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub callback_pct: Option<Decimal>,
    pub activation: Option<Decimal>,
    pub reduce_only: bool,
}

/// In-memory exchange; tests drive it by setting the ticker and the
/// observed position between polls.
pub struct FakeExchange {
    pub ticker: Mutex<Decimal>,
    pub candles: Mutex<Vec<Candle>>,
    pub position: Mutex<Option<PositionSnapshot>>,
    pub orders: Mutex<Vec<OrderRecord>>,
    pub cancels: Mutex<Vec<&'static str>>,
    pub spec: MarketSpec,
}

impl FakeExchange {
    pub fn new() -> Self {
        Self {
            ticker: Mutex::new(dec!(100)),
            candles: Mutex::new(constant_range_candles(22, dec!(100))),
            position: Mutex::new(None),
            orders: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            spec: MarketSpec {
                price_precision: 2,
                amount_precision: 4,
                min_amount: dec!(0.001),
                tick_size: dec!(0.01),
            },
        }
    }

    pub fn set_ticker(&self, price: Decimal) {
        *self.ticker.lock().unwrap() = price;
    }

    pub fn set_position(&self, amount: Decimal, avg_price: Decimal) {
        *self.position.lock().unwrap() = if amount == Decimal::ZERO {
            None
        } else {
            Some(PositionSnapshot { amount, avg_price })
        };
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders.lock().unwrap().clone()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn cancel_log(&self) -> Vec<&'static str> {
        self.cancels.lock().unwrap().clone()
    }

    fn record(&self, order: OrderRecord) -> Result<OrderAck> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order);
        Ok(OrderAck {
            order_id: Some(orders.len().to_string()),
        })
    }
}

/// Candles with a constant true range, so the volatility unit is exact
pub fn constant_range_candles(n: usize, range: Decimal) -> Vec<Candle> {
    let half = range / dec!(2);
    (0..n as i64)
        .map(|i| Candle {
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i),
            open: dec!(100),
            high: dec!(100) + half,
            low: dec!(100) - half,
            close: dec!(100),
        })
        .collect()
}

/// Settings with every delay zeroed and cache persistence off
pub fn test_settings() -> AppSettings {
    AppSettings {
        retry_delay_ms: 0,
        settle_delay_ms: 0,
        poll_interval_ms: 0,
        precision_cache_path: String::new(),
        ..Default::default()
    }
}

#[async_trait]
impl MarketData for FakeExchange {
    async fn get_ticker(&self, _symbol: &str) -> Result<Decimal> {
        Ok(*self.ticker.lock().unwrap())
    }

    async fn get_position(
        &self,
        _symbol: &str,
        _direction: Direction,
    ) -> Result<Option<PositionSnapshot>> {
        Ok(*self.position.lock().unwrap())
    }

    async fn get_daily_candles(&self, _symbol: &str, count: usize) -> Result<Vec<Candle>> {
        let candles = self.candles.lock().unwrap();
        let start = candles.len().saturating_sub(count);
        Ok(candles[start..].to_vec())
    }
}

#[async_trait]
impl OrderTransport for FakeExchange {
    async fn submit_market(&self, _symbol: &str, side: Side, qty: Decimal) -> Result<OrderAck> {
        self.record(OrderRecord {
            kind: OrderKind::Market,
            side,
            qty,
            price: None,
            callback_pct: None,
            activation: None,
            reduce_only: false,
        })
    }

    async fn submit_limit(
        &self,
        _symbol: &str,
        side: Side,
        qty: Decimal,
        price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        self.record(OrderRecord {
            kind: OrderKind::Limit,
            side,
            qty,
            price: Some(price),
            callback_pct: None,
            activation: None,
            reduce_only,
        })
    }

    async fn submit_stop_market(
        &self,
        _symbol: &str,
        side: Side,
        qty: Decimal,
        trigger_price: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        self.record(OrderRecord {
            kind: OrderKind::StopMarket,
            side,
            qty,
            price: Some(trigger_price),
            callback_pct: None,
            activation: None,
            reduce_only,
        })
    }

    async fn submit_trailing_stop(
        &self,
        _symbol: &str,
        side: Side,
        qty: Decimal,
        callback_rate_pct: Decimal,
        activation_price: Option<Decimal>,
        reduce_only: bool,
    ) -> Result<OrderAck> {
        self.record(OrderRecord {
            kind: OrderKind::Trailing,
            side,
            qty,
            price: None,
            callback_pct: Some(callback_rate_pct),
            activation: activation_price,
            reduce_only,
        })
    }

    async fn cancel_order(&self, _symbol: &str, _order_id: &str) -> Result<()> {
        self.cancels.lock().unwrap().push("single");
        Ok(())
    }

    async fn cancel_open_orders(&self, _symbol: &str) -> Result<()> {
        self.cancels.lock().unwrap().push("open");
        Ok(())
    }

    async fn cancel_algo_orders(&self, _symbol: &str) -> Result<()> {
        self.cancels.lock().unwrap().push("algo");
        Ok(())
    }
}

#[async_trait]
impl InstrumentMeta for FakeExchange {
    async fn get_market_spec(&self, _symbol: &str) -> Result<MarketSpec> {
        Ok(self.spec.clone())
    }
}
