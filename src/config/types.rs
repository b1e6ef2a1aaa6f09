//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Exchange connectivity
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Strategy tuning; defaults to the live parameter set
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Exchange connectivity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// API key for signed requests
    #[serde(default)]
    pub api_key: Option<String>,
    /// API secret for signing requests
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Base URL for the USDT-M futures REST API
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// recvWindow for signed requests, milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            rest_url: default_rest_url(),
            recv_window_ms: default_recv_window(),
        }
    }
}

fn default_rest_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

/// One leg of a take-profit ladder: a price distance in volatility units and
/// the fraction of the full position to exit there
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileLeg {
    /// Distance from the base fill price, in volatility units
    pub atr_multiple: Decimal,
    /// Fraction of the full position size
    pub fraction: Decimal,
}

impl ProfileLeg {
    pub fn new(atr_multiple: Decimal, fraction: Decimal) -> Self {
        Self {
            atr_multiple,
            fraction,
        }
    }
}

/// Strategy tuning parameters.
///
/// All `*_atr` fields are distances expressed in volatility units. Fractions
/// in a take-profit ladder need not sum to 1; uncovered size exits via the
/// stop or trailing leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Period for the true-range volatility proxy (daily candles)
    pub atr_period: usize,
    /// Callback distance for trailing entries, in volatility units
    pub entry_callback: Decimal,
    /// Stop multiple used to size the full position from the risk budget
    pub size_stop_multiple: Decimal,
    /// Base position fraction of the full size
    pub base_position_pct: Decimal,
    /// Add-on fraction of the full size
    pub add_position_pct: Decimal,
    /// Base-stage stop distance
    pub base_stop_atr: Decimal,
    /// Add-on trigger distance (favorable)
    pub add_trigger_atr: Decimal,
    /// Protective stop arming threshold (favorable)
    pub protective_trigger_atr: Decimal,
    /// Protective stop placement distance (adverse)
    pub protective_offset_atr: Decimal,
    /// Full-position stop distance
    pub full_stop_atr: Decimal,
    /// Trailing take-profit activation distance (favorable)
    pub trail_activation_atr: Decimal,
    /// Trailing take-profit callback distance
    pub trail_callback_atr: Decimal,
    /// Take-profit ladder for the narrow volatility profile
    pub profile_narrow: Vec<ProfileLeg>,
    /// Take-profit ladder for the medium volatility profile
    pub profile_medium: Vec<ProfileLeg>,
    /// Take-profit ladder for the wide volatility profile
    pub profile_wide: Vec<ProfileLeg>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::live()
    }
}

impl StrategyConfig {
    /// Production parameter set
    pub fn live() -> Self {
        Self {
            atr_period: 20,
            entry_callback: dec!(0.12),
            size_stop_multiple: dec!(0.4),
            base_position_pct: dec!(0.4),
            add_position_pct: dec!(0.6),
            base_stop_atr: dec!(0.6),
            add_trigger_atr: dec!(0.1),
            protective_trigger_atr: dec!(0.2),
            protective_offset_atr: dec!(0.2),
            full_stop_atr: dec!(0.3),
            trail_activation_atr: dec!(0.28),
            trail_callback_atr: dec!(0.15),
            profile_narrow: vec![ProfileLeg::new(dec!(0.3), dec!(0.9))],
            profile_medium: vec![
                ProfileLeg::new(dec!(0.35), dec!(0.25)),
                ProfileLeg::new(dec!(0.5), dec!(0.45)),
                ProfileLeg::new(dec!(0.65), dec!(0.2)),
            ],
            profile_wide: vec![ProfileLeg::new(dec!(0.65), dec!(0.8))],
        }
    }

    /// Paper-trading parameter set: the live table with every price distance
    /// compressed by a single scale factor, so fills happen at simulation
    /// noise levels instead of real trend moves.
    pub fn paper() -> Self {
        Self::live().scaled(dec!(0.05))
    }

    /// Scale all volatility-unit distances by `factor`. Position split
    /// fractions, ladder fractions and the sizing stop multiple are left
    /// untouched.
    pub fn scaled(mut self, factor: Decimal) -> Self {
        self.entry_callback *= factor;
        self.base_stop_atr *= factor;
        self.add_trigger_atr *= factor;
        self.protective_trigger_atr *= factor;
        self.protective_offset_atr *= factor;
        self.full_stop_atr *= factor;
        self.trail_activation_atr *= factor;
        self.trail_callback_atr *= factor;
        for legs in [
            &mut self.profile_narrow,
            &mut self.profile_medium,
            &mut self.profile_wide,
        ] {
            for leg in legs.iter_mut() {
                leg.atr_multiple *= factor;
            }
        }
        self
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Poll loop interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Attempts for conditional order placement
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between retry attempts, milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Settle delay inside and between cancel-all passes, milliseconds
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Path of the persisted symbol precision cache
    #[serde(default = "default_precision_cache_path")]
    pub precision_cache_path: String,
    /// Optional webhook URL for lifecycle notifications
    #[serde(default)]
    pub notify_webhook: Option<String>,
    /// Use the paper-trading strategy scaling
    #[serde(default)]
    pub paper: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            settle_delay_ms: default_settle_delay(),
            precision_cache_path: default_precision_cache_path(),
            notify_webhook: None,
            paper: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    500
}

fn default_settle_delay() -> u64 {
    500
}

fn default_precision_cache_path() -> String {
    "precision_cache.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_defaults() {
        let cfg = StrategyConfig::live();
        assert_eq!(cfg.atr_period, 20);
        assert_eq!(cfg.base_position_pct, dec!(0.4));
        assert_eq!(cfg.profile_medium.len(), 3);
        assert_eq!(cfg.profile_medium[1].atr_multiple, dec!(0.5));
        assert_eq!(cfg.profile_medium[1].fraction, dec!(0.45));
    }

    #[test]
    fn test_paper_scales_distances_only() {
        let live = StrategyConfig::live();
        let paper = StrategyConfig::paper();
        assert_eq!(paper.base_stop_atr, live.base_stop_atr * dec!(0.05));
        assert_eq!(paper.full_stop_atr, live.full_stop_atr * dec!(0.05));
        assert_eq!(
            paper.profile_narrow[0].atr_multiple,
            live.profile_narrow[0].atr_multiple * dec!(0.05)
        );
        // split fractions and sizing multiple are not scaled
        assert_eq!(paper.base_position_pct, live.base_position_pct);
        assert_eq!(paper.size_stop_multiple, live.size_stop_multiple);
        assert_eq!(paper.profile_narrow[0].fraction, live.profile_narrow[0].fraction);
    }
}
