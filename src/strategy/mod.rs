//! Multi-stage position lifecycle strategy

pub mod machine;
pub mod runner;
pub mod types;
pub mod volatility;

pub use machine::StrategyMachine;
pub use runner::{parse_command, Command, StrategyRunner};
pub use types::{
    ConfirmSnapshot, EntryMode, LifecycleState, PositionIntent, StartParams, VolatilityProfile,
    VolatilitySource, VolatilityUnit,
};
