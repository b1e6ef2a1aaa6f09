//! Order gateway: precision formatting, bounded retries, broad cancellation
//!
//! The gateway sits between the strategy core and the raw transport. It never
//! reinterprets trading intent; it formats prices and amounts to the symbol's
//! precision, validates minimum size, retries transient failures on
//! conditional orders and provides the two-phase cancel paths.

use std::sync::Arc;
use std::time::Duration;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::common::errors::{Result, StrategyError};
use crate::common::traits::OrderTransport;
use crate::common::types::{MarketSpec, OrderAck, Side};
use crate::config::AppSettings;

/// Retry and settle timing for the gateway
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total placement attempts for conditional orders
    pub attempts: u32,
    /// Pause between placement attempts
    pub retry_delay: Duration,
    /// Pause between cancellation phases, letting the exchange settle
    pub settle_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            attempts: settings.retry_attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Places and cancels orders on behalf of the strategy core
pub struct OrderGateway<T: OrderTransport> {
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T: OrderTransport> OrderGateway<T> {
    pub fn new(transport: Arc<T>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn settle_delay(&self) -> Duration {
        self.policy.settle_delay
    }

    fn format_qty(&self, qty: Decimal, spec: &MarketSpec) -> Result<Decimal> {
        let rounded = spec.round_amount(qty);
        if rounded < spec.min_amount {
            return Err(StrategyError::OrderRejected(format!(
                "quantity {} below minimum {}",
                rounded, spec.min_amount
            )));
        }
        Ok(rounded)
    }

    /// Market order, placed once (fills or fails immediately)
    pub async fn place_market(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        spec: &MarketSpec,
    ) -> Result<OrderAck> {
        let qty = self.format_qty(qty, spec)?;
        debug!("[{}] market {} {}", symbol, side, qty);
        self.transport.submit_market(symbol, side, qty).await
    }

    /// Resting limit order, placed once
    pub async fn place_limit(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Decimal,
        reduce_only: bool,
        spec: &MarketSpec,
    ) -> Result<OrderAck> {
        let qty = self.format_qty(qty, spec)?;
        let price = spec.round_price(price);
        debug!("[{}] limit {} {} @ {}", symbol, side, qty, price);
        self.transport
            .submit_limit(symbol, side, qty, price, reduce_only)
            .await
    }

    /// Conditional stop-market order, retried on transport failures
    pub async fn place_stop_market(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        trigger_price: Decimal,
        reduce_only: bool,
        spec: &MarketSpec,
    ) -> Result<OrderAck> {
        let qty = self.format_qty(qty, spec)?;
        let trigger = spec.round_price(trigger_price);
        for attempt in 1..=self.policy.attempts {
            match self
                .transport
                .submit_stop_market(symbol, side, qty, trigger, reduce_only)
                .await
            {
                Ok(ack) => {
                    debug!("[{}] stop {} {} trigger {}", symbol, side, qty, trigger);
                    return Ok(ack);
                }
                Err(StrategyError::Transport(msg)) if attempt < self.policy.attempts => {
                    warn!(
                        "[{}] stop placement attempt {}/{} failed: {}",
                        symbol, attempt, self.policy.attempts, msg
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StrategyError::Transport(
            "stop placement retries exhausted".to_string(),
        ))
    }

    /// Conditional trailing-stop order, retried on transport failures
    pub async fn place_trailing_stop(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        callback_rate_pct: Decimal,
        activation_price: Option<Decimal>,
        reduce_only: bool,
        spec: &MarketSpec,
    ) -> Result<OrderAck> {
        let qty = self.format_qty(qty, spec)?;
        let activation = activation_price.map(|p| spec.round_price(p));
        for attempt in 1..=self.policy.attempts {
            match self
                .transport
                .submit_trailing_stop(symbol, side, qty, callback_rate_pct, activation, reduce_only)
                .await
            {
                Ok(ack) => {
                    debug!(
                        "[{}] trailing {} {} callback {}% activation {:?}",
                        symbol, side, qty, callback_rate_pct, activation
                    );
                    return Ok(ack);
                }
                Err(StrategyError::Transport(msg)) if attempt < self.policy.attempts => {
                    warn!(
                        "[{}] trailing placement attempt {}/{} failed: {}",
                        symbol, attempt, self.policy.attempts, msg
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StrategyError::Transport(
            "trailing placement retries exhausted".to_string(),
        ))
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<()> {
        self.transport.cancel_order(symbol, order_id).await
    }

    /// Cancel everything working for a symbol. One sweep hits the resting
    /// orders first, pauses to settle, then hits the conditional orders; the
    /// whole sweep runs twice with a settle pause between, absorbing the
    /// exchange's cancellation propagation lag. Nothing left to cancel is
    /// success.
    pub async fn cancel_all(&self, symbol: &str) -> Result<()> {
        self.sweep(symbol).await?;
        tokio::time::sleep(self.policy.settle_delay).await;
        self.sweep(symbol).await
    }

    async fn sweep(&self, symbol: &str) -> Result<()> {
        self.transport.cancel_open_orders(symbol).await?;
        tokio::time::sleep(self.policy.settle_delay).await;
        self.transport.cancel_algo_orders(symbol).await
    }
}
