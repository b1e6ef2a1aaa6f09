//! Single-task command and poll loop
//!
//! The machine is owned by one task. Each loop iteration drains any queued
//! operator commands, runs one observation cycle, then sleeps for the poll
//! interval, so commands and polls never overlap.

use std::time::Duration;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::common::errors::{Result, StrategyError};
use crate::common::traits::ExchangeApi;
use crate::common::types::Direction;
use crate::strategy::machine::StrategyMachine;
use crate::strategy::types::{EntryMode, StartParams, VolatilityProfile};

/// Operator commands accepted by the runner
#[derive(Debug)]
pub enum Command {
    Start(StartParams),
    Confirm,
    Cancel,
    Reset,
    Status(oneshot::Sender<String>),
}

/// Parse an operator command line.
///
/// Grammar:
///   start SYMBOL long|short RISK market|trail [PROFILE] [pct=N]
///   start SYMBOL long|short RISK limit|trail-limit PRICE [PROFILE] [pct=N]
///   confirm | cancel | reset | status
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    match word {
        "confirm" => Ok(Some(Command::Confirm)),
        "cancel" => Ok(Some(Command::Cancel)),
        "reset" => Ok(Some(Command::Reset)),
        "start" => {
            let symbol = next_arg(&mut parts, "symbol")?.to_uppercase();
            let direction = match next_arg(&mut parts, "direction")? {
                "long" => Direction::Long,
                "short" => Direction::Short,
                other => {
                    return Err(StrategyError::Configuration(format!(
                        "direction must be long or short, got '{}'",
                        other
                    )))
                }
            };
            let risk_budget: Decimal = next_arg(&mut parts, "risk budget")?
                .parse()
                .map_err(|e| StrategyError::Configuration(format!("bad risk budget: {}", e)))?;
            let entry_mode: EntryMode = next_arg(&mut parts, "entry mode")?.parse()?;
            let limit_price = if entry_mode.needs_price() {
                let raw = next_arg(&mut parts, "price")?;
                Some(raw.parse().map_err(|e| {
                    StrategyError::Configuration(format!("bad price: {}", e))
                })?)
            } else {
                None
            };

            let mut profile = VolatilityProfile::Medium;
            let mut volatility_pct = None;
            for token in parts {
                if let Some(pct) = token.strip_prefix("pct=") {
                    volatility_pct = Some(pct.parse().map_err(|e| {
                        StrategyError::Configuration(format!("bad volatility percentage: {}", e))
                    })?);
                } else {
                    profile = token.parse()?;
                }
            }

            Ok(Some(Command::Start(StartParams {
                symbol,
                direction,
                risk_budget,
                entry_mode,
                limit_price,
                profile,
                volatility_pct,
            })))
        }
        other => Err(StrategyError::Configuration(format!(
            "unknown command '{}'",
            other
        ))),
    }
}

fn next_arg<'a>(parts: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str> {
    parts
        .next()
        .ok_or_else(|| StrategyError::Configuration(format!("missing {}", what)))
}

/// Drives a machine from a command channel
pub struct StrategyRunner<E: ExchangeApi> {
    machine: StrategyMachine<E>,
    commands: mpsc::Receiver<Command>,
    poll_interval: Duration,
}

impl<E: ExchangeApi> StrategyRunner<E> {
    pub fn new(
        machine: StrategyMachine<E>,
        commands: mpsc::Receiver<Command>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            machine,
            commands,
            poll_interval,
        }
    }

    /// Run until the command channel closes
    pub async fn run(mut self) {
        info!("strategy runner started, poll interval {:?}", self.poll_interval);
        loop {
            loop {
                match self.commands.try_recv() {
                    Ok(cmd) => self.handle(cmd).await,
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        info!("command channel closed, runner stopping");
                        return;
                    }
                }
            }
            self.machine.poll().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn handle(&mut self, cmd: Command) {
        let outcome = match cmd {
            Command::Start(params) => {
                let res = self.machine.start(params).await;
                if res.is_ok() {
                    if let Some(msg) = self.machine.confirm_message() {
                        info!("awaiting confirmation: {}", msg);
                    }
                }
                res
            }
            Command::Confirm => self.machine.confirm().await,
            Command::Cancel => self.machine.cancel().await,
            Command::Reset => self.machine.reset().await,
            Command::Status(reply) => {
                let _ = reply.send(self.machine.status());
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("command failed: {}", e);
        }
    }
}
