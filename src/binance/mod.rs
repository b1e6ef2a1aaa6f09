//! Binance USDT-M futures connectivity

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::{ApiCredentials, BinanceFuturesClient};
