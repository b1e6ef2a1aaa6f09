//! Unified types shared by the exchange layer and the strategy core

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposing side
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Position direction for a lifecycle (long or short)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side used to open or add to the position
    pub fn entry_side(self) -> Side {
        match self {
            Direction::Long => Side::Buy,
            Direction::Short => Side::Sell,
        }
    }

    /// Side used to reduce or close the position
    pub fn exit_side(self) -> Side {
        self.entry_side().opposite()
    }

    /// Signed unit multiplier: +1 for long, -1 for short
    pub fn signum(self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Price offset in the favorable direction (toward profit)
    pub fn favorable(self, anchor: Decimal, distance: Decimal) -> Decimal {
        anchor + self.signum() * distance
    }

    /// Price offset in the adverse direction (toward loss)
    pub fn adverse(self, anchor: Decimal, distance: Decimal) -> Decimal {
        anchor - self.signum() * distance
    }

    /// True when `price` has moved favorably to or past `trigger`
    pub fn reached(self, price: Decimal, trigger: Decimal) -> bool {
        match self {
            Direction::Long => price >= trigger,
            Direction::Short => price <= trigger,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// A single daily OHLC candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Observed position state for one symbol/direction, as reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Absolute position size (contracts), zero means flat
    pub amount: Decimal,
    /// Average entry price of the open position
    pub avg_price: Decimal,
}

impl PositionSnapshot {
    pub fn flat() -> Self {
        Self {
            amount: Decimal::ZERO,
            avg_price: Decimal::ZERO,
        }
    }
}

/// Per-symbol rounding rules and minimum tradable size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSpec {
    /// Decimal places for prices
    pub price_precision: u32,
    /// Decimal places for amounts
    pub amount_precision: u32,
    /// Minimum tradable amount
    pub min_amount: Decimal,
    /// Minimum price increment
    pub tick_size: Decimal,
}

impl MarketSpec {
    /// Truncate a price to this symbol's price precision
    pub fn round_price(&self, price: Decimal) -> Decimal {
        price.trunc_with_scale(self.price_precision)
    }

    /// Truncate an amount to this symbol's amount precision
    pub fn round_amount(&self, amount: Decimal) -> Decimal {
        amount.trunc_with_scale(self.amount_precision)
    }

    /// Tolerance band for judging an observed size "close enough" to an
    /// expected size. The band is exclusive: a deviation equal to it does
    /// not match.
    pub fn tolerance(&self) -> Decimal {
        self.min_amount * Decimal::TWO
    }
}

/// Acknowledgement returned by the exchange for a placed order.
/// Ephemeral: not retained beyond the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_sides() {
        assert_eq!(Direction::Long.entry_side(), Side::Buy);
        assert_eq!(Direction::Long.exit_side(), Side::Sell);
        assert_eq!(Direction::Short.entry_side(), Side::Sell);
        assert_eq!(Direction::Short.exit_side(), Side::Buy);
    }

    #[test]
    fn test_direction_offsets() {
        assert_eq!(Direction::Long.favorable(dec!(100), dec!(10)), dec!(110));
        assert_eq!(Direction::Long.adverse(dec!(100), dec!(10)), dec!(90));
        assert_eq!(Direction::Short.favorable(dec!(100), dec!(10)), dec!(90));
        assert_eq!(Direction::Short.adverse(dec!(100), dec!(10)), dec!(110));
    }

    #[test]
    fn test_direction_reached() {
        assert!(Direction::Long.reached(dec!(120), dec!(120)));
        assert!(!Direction::Long.reached(dec!(119.9), dec!(120)));
        assert!(Direction::Short.reached(dec!(80), dec!(80)));
        assert!(!Direction::Short.reached(dec!(80.1), dec!(80)));
    }

    #[test]
    fn test_round_truncates() {
        let spec = MarketSpec {
            price_precision: 2,
            amount_precision: 3,
            min_amount: dec!(0.001),
            tick_size: dec!(0.01),
        };
        assert_eq!(spec.round_price(dec!(123.4567)), dec!(123.45));
        assert_eq!(spec.round_amount(dec!(0.9999)), dec!(0.999));
        assert_eq!(spec.tolerance(), dec!(0.002));
    }
}
