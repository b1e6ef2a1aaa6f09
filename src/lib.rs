//! BinancePyramid Library
//!
//! A Rust library implementing a multi-stage leveraged position lifecycle on
//! Binance USDT-M futures: plan, confirm, base entry, add-on, and an
//! exchange-resident exit set (stop, trailing take-profit, ladder).

pub mod binance;
pub mod common;
pub mod config;
pub mod execution;
pub mod strategy;

// Re-export commonly used types
pub use binance::{ApiCredentials, BinanceFuturesClient};
pub use common::errors::{Result, StrategyError};
pub use common::notify::{BoxedNotifier, NoopNotifier, Notifier, WebhookNotifier};
pub use common::traits::{ExchangeApi, InstrumentMeta, MarketData, OrderTransport};
pub use common::types::{Candle, Direction, MarketSpec, OrderAck, PositionSnapshot, Side};
pub use config::{AppConfig, AppSettings, ExchangeConfig, ProfileLeg, StrategyConfig};
pub use execution::{OrderGateway, PrecisionResolver, RetryPolicy};

// Strategy types
pub use strategy::{
    parse_command, Command, ConfirmSnapshot, EntryMode, LifecycleState, PositionIntent,
    StartParams, StrategyMachine, StrategyRunner, VolatilityProfile, VolatilitySource,
    VolatilityUnit,
};
