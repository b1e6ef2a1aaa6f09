//! Types describing one position lifecycle

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::StrategyError;
use crate::common::types::{Direction, MarketSpec};
use crate::config::ProfileLeg;

/// Lifecycle state of the strategy machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No lifecycle in progress
    Idle,
    /// Plan computed, waiting for operator confirmation
    WaitConfirm,
    /// Entry order working, waiting for the base fill
    WaitEntry,
    /// Base position open, waiting for the add-on fill or the base stop
    EntryDone,
    /// Full position open, exit legs working
    WaitExit,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Idle => "IDLE",
            LifecycleState::WaitConfirm => "WAIT_CONFIRM",
            LifecycleState::WaitEntry => "WAIT_ENTRY",
            LifecycleState::EntryDone => "ENTRY_DONE",
            LifecycleState::WaitExit => "WAIT_EXIT",
        };
        write!(f, "{}", s)
    }
}

/// How the base position is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    /// Immediate market order
    Market,
    /// Resting limit order at the operator's price
    Limit,
    /// Trailing entry armed immediately at the current price
    TrailingMarket,
    /// Trailing entry armed once the operator's activation price trades
    TrailingLimit,
}

impl EntryMode {
    /// True for the modes that require an operator-supplied price
    pub fn needs_price(self) -> bool {
        matches!(self, EntryMode::Limit | EntryMode::TrailingLimit)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryMode::Market => "market",
            EntryMode::Limit => "limit",
            EntryMode::TrailingMarket => "trail",
            EntryMode::TrailingLimit => "trail-limit",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EntryMode {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(EntryMode::Market),
            "limit" => Ok(EntryMode::Limit),
            "trail" => Ok(EntryMode::TrailingMarket),
            "trail-limit" => Ok(EntryMode::TrailingLimit),
            other => Err(StrategyError::Configuration(format!(
                "unknown entry mode '{}'",
                other
            ))),
        }
    }
}

/// Which take-profit ladder shape to trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityProfile {
    Narrow,
    Medium,
    Wide,
}

impl std::fmt::Display for VolatilityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VolatilityProfile::Narrow => "narrow",
            VolatilityProfile::Medium => "medium",
            VolatilityProfile::Wide => "wide",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for VolatilityProfile {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "narrow" => Ok(VolatilityProfile::Narrow),
            "medium" => Ok(VolatilityProfile::Medium),
            "wide" => Ok(VolatilityProfile::Wide),
            other => Err(StrategyError::Configuration(format!(
                "unknown volatility profile '{}'",
                other
            ))),
        }
    }
}

impl VolatilityProfile {
    /// The ladder legs for this profile from a strategy config
    pub fn legs<'a>(&self, cfg: &'a crate::config::StrategyConfig) -> &'a [ProfileLeg] {
        match self {
            VolatilityProfile::Narrow => &cfg.profile_narrow,
            VolatilityProfile::Medium => &cfg.profile_medium,
            VolatilityProfile::Wide => &cfg.profile_wide,
        }
    }
}

/// Where the volatility unit for a lifecycle comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VolatilitySource {
    /// True-range average over daily candles
    Period(usize),
    /// Fixed percentage of the current price
    Percentage(Decimal),
}

/// The volatility unit all price distances are multiples of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityUnit {
    pub value: Decimal,
    pub source: VolatilitySource,
}

impl std::fmt::Display for VolatilityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source {
            VolatilitySource::Period(n) => write!(f, "{} (ATR {})", self.value, n),
            VolatilitySource::Percentage(p) => write!(f, "{} ({}% of price)", self.value, p),
        }
    }
}

/// Operator-supplied parameters for starting a lifecycle
#[derive(Debug, Clone)]
pub struct StartParams {
    pub symbol: String,
    pub direction: Direction,
    /// Maximum loss, in quote currency, if the full position stops out at
    /// the sizing stop distance
    pub risk_budget: Decimal,
    pub entry_mode: EntryMode,
    /// Limit or activation price for the modes that need one
    pub limit_price: Option<Decimal>,
    pub profile: VolatilityProfile,
    /// Fixed volatility percentage; `None` selects the true-range average
    pub volatility_pct: Option<Decimal>,
}

/// Plan presented to the operator before any order is placed
#[derive(Debug, Clone)]
pub struct ConfirmSnapshot {
    pub current_price: Decimal,
    pub unit: VolatilityUnit,
    pub base_amount: Decimal,
    pub full_amount: Decimal,
    pub base_value: Decimal,
    pub full_value: Decimal,
}

/// Everything the machine tracks for the lifecycle in progress
#[derive(Debug, Clone)]
pub struct PositionIntent {
    pub symbol: String,
    pub direction: Direction,
    pub risk_budget: Decimal,
    pub entry_mode: EntryMode,
    pub limit_price: Option<Decimal>,
    pub profile: VolatilityProfile,
    pub unit: VolatilityUnit,
    pub spec: MarketSpec,
    /// Target size of the completed position
    pub full_amount: Decimal,
    /// Size of the initial entry
    pub base_amount: Decimal,
    /// Average fill price of the base entry, known once the base fills
    pub base_price: Option<Decimal>,
    /// Position size observed on the previous poll
    pub last_amount: Decimal,
    /// Set once the protective re-anchor has run; it never runs twice
    pub protective_placed: bool,
    /// Present until the operator confirms
    pub pending_confirm: Option<ConfirmSnapshot>,
}
