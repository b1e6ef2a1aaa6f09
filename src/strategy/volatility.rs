//! Volatility unit and position sizing math

use rust_decimal::Decimal;

use crate::common::errors::{Result, StrategyError};
use crate::common::types::Candle;
use crate::strategy::types::{VolatilitySource, VolatilityUnit};

/// Exchange bounds on the trailing-stop callback rate, in percent
const MIN_CALLBACK_PCT: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1
const MAX_CALLBACK_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 0); // 5

/// Average true range over `period` daily candles, evaluated at the
/// second-to-last candle so the unfinished current candle never contributes.
///
/// Needs `period + 2` candles: one extra closed candle ahead of the window
/// for the first true range's previous close, plus the unfinished one.
pub fn atr_unit(candles: &[Candle], period: usize) -> Result<VolatilityUnit> {
    let needed = period + 2;
    if candles.len() < needed {
        return Err(StrategyError::DataInsufficient {
            needed,
            got: candles.len(),
        });
    }

    // windows ending at the second-to-last candle
    let closed = &candles[..candles.len() - 1];
    let start = closed.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..closed.len() {
        sum += true_range(&closed[i], &closed[i - 1]);
    }
    let value = sum / Decimal::from(period);
    Ok(VolatilityUnit {
        value,
        source: VolatilitySource::Period(period),
    })
}

/// True range of a candle given its predecessor
fn true_range(candle: &Candle, prev: &Candle) -> Decimal {
    let hl = candle.high - candle.low;
    let hc = (candle.high - prev.close).abs();
    let lc = (candle.low - prev.close).abs();
    hl.max(hc).max(lc)
}

/// Volatility unit as a fixed percentage of the current price
pub fn percentage_unit(price: Decimal, pct: Decimal) -> VolatilityUnit {
    VolatilityUnit {
        value: price * pct / Decimal::ONE_HUNDRED,
        source: VolatilitySource::Percentage(pct),
    }
}

/// Full position size such that a stop `stop_multiple` volatility units away
/// loses exactly the risk budget.
pub fn compute_full_size(
    risk_budget: Decimal,
    unit_value: Decimal,
    stop_multiple: Decimal,
) -> Result<Decimal> {
    let stop_distance = unit_value * stop_multiple;
    if stop_distance <= Decimal::ZERO {
        return Err(StrategyError::Configuration(format!(
            "non-positive sizing stop distance {} (unit {}, multiple {})",
            stop_distance, unit_value, stop_multiple
        )));
    }
    Ok(risk_budget / stop_distance)
}

/// Convert a price distance into the exchange's trailing callback rate:
/// percent of the reference price, clamped to the accepted range and
/// rounded to two decimals.
pub fn callback_rate_pct(distance: Decimal, reference_price: Decimal) -> Result<Decimal> {
    if reference_price <= Decimal::ZERO {
        return Err(StrategyError::Configuration(format!(
            "non-positive reference price {} for callback rate",
            reference_price
        )));
    }
    let pct = distance / reference_price * Decimal::ONE_HUNDRED;
    Ok(pct.clamp(MIN_CALLBACK_PCT, MAX_CALLBACK_PCT).round_dp(2))
}
