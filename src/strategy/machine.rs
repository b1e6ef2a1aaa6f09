//! The position lifecycle state machine
//!
//! One machine drives at most one lifecycle at a time through
//! IDLE -> WAIT_CONFIRM -> WAIT_ENTRY -> ENTRY_DONE -> WAIT_EXIT and back to
//! IDLE. Transitions after confirmation are driven entirely by observed
//! position size deltas, never by tracked order ids, so fills the process
//! missed (or a restart lost) are picked up on the next poll.

use std::sync::Arc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::common::errors::{Result, StrategyError};
use crate::common::notify::BoxedNotifier;
use crate::common::traits::ExchangeApi;
use crate::config::{AppSettings, StrategyConfig};
use crate::execution::{OrderGateway, PrecisionResolver, RetryPolicy};
use crate::strategy::types::{
    ConfirmSnapshot, EntryMode, LifecycleState, PositionIntent, StartParams,
};
use crate::strategy::volatility::{
    atr_unit, callback_rate_pct, compute_full_size, percentage_unit,
};

pub struct StrategyMachine<E: ExchangeApi> {
    exchange: Arc<E>,
    gateway: OrderGateway<E>,
    precision: PrecisionResolver<E>,
    notifier: BoxedNotifier,
    config: StrategyConfig,
    state: LifecycleState,
    intent: Option<PositionIntent>,
}

impl<E: ExchangeApi> StrategyMachine<E> {
    /// Build a machine from settings. An empty precision cache path disables
    /// cache persistence.
    pub fn new(
        exchange: Arc<E>,
        config: StrategyConfig,
        settings: &AppSettings,
        notifier: BoxedNotifier,
    ) -> Self {
        let gateway = OrderGateway::new(exchange.clone(), RetryPolicy::from_settings(settings));
        let precision = if settings.precision_cache_path.is_empty() {
            PrecisionResolver::in_memory(exchange.clone())
        } else {
            PrecisionResolver::new(exchange.clone(), settings.precision_cache_path.clone())
        };
        Self {
            exchange,
            gateway,
            precision,
            notifier,
            config,
            state: LifecycleState::Idle,
            intent: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn intent(&self) -> Option<&PositionIntent> {
        self.intent.as_ref()
    }

    /// Plan a new lifecycle: resolve precision, derive the volatility unit,
    /// size the position and park the plan for confirmation. Places no
    /// orders. Fails without side effects when data or precision is missing.
    pub async fn start(&mut self, params: StartParams) -> Result<()> {
        if self.state != LifecycleState::Idle {
            return Err(StrategyError::InvalidState {
                command: "start".to_string(),
                state: self.state.to_string(),
            });
        }
        if params.risk_budget <= Decimal::ZERO {
            return Err(StrategyError::Configuration(format!(
                "risk budget must be positive, got {}",
                params.risk_budget
            )));
        }
        if params.entry_mode.needs_price() && params.limit_price.is_none() {
            return Err(StrategyError::Configuration(format!(
                "{} entry requires a price",
                params.entry_mode
            )));
        }

        let spec = self.precision.resolve(&params.symbol).await?;
        let price = self.exchange.get_ticker(&params.symbol).await?;

        let unit = match params.volatility_pct {
            Some(pct) => percentage_unit(price, pct),
            None => {
                let count = self.config.atr_period + 2;
                let candles = self.exchange.get_daily_candles(&params.symbol, count).await?;
                atr_unit(&candles, self.config.atr_period)?
            }
        };

        let full_raw = compute_full_size(
            params.risk_budget,
            unit.value,
            self.config.size_stop_multiple,
        )?;
        let full_amount = spec.round_amount(full_raw);
        let base_amount = spec.round_amount(full_amount * self.config.base_position_pct);
        if base_amount < spec.min_amount {
            return Err(StrategyError::Configuration(format!(
                "base size {} below minimum {}; increase the risk budget",
                base_amount, spec.min_amount
            )));
        }

        let snapshot = ConfirmSnapshot {
            current_price: price,
            unit,
            base_amount,
            full_amount,
            base_value: base_amount * price,
            full_value: full_amount * price,
        };
        info!(
            "[{}] lifecycle planned: {} {} base {} full {} unit {}",
            params.symbol, params.direction, params.entry_mode, base_amount, full_amount, unit
        );

        self.intent = Some(PositionIntent {
            symbol: params.symbol,
            direction: params.direction,
            risk_budget: params.risk_budget,
            entry_mode: params.entry_mode,
            limit_price: params.limit_price.map(|p| spec.round_price(p)),
            profile: params.profile,
            unit,
            spec,
            full_amount,
            base_amount,
            base_price: None,
            last_amount: Decimal::ZERO,
            protective_placed: false,
            pending_confirm: Some(snapshot),
        });
        self.state = LifecycleState::WaitConfirm;
        Ok(())
    }

    /// Human-readable summary of the plan awaiting confirmation
    pub fn confirm_message(&self) -> Option<String> {
        let intent = self.intent.as_ref()?;
        let snap = intent.pending_confirm.as_ref()?;
        Some(format!(
            "{} {} via {} | price {} | unit {} | base {} ({} quote) | full {} ({} quote) | \
             profile {} | risk {}",
            intent.direction,
            intent.symbol,
            intent.entry_mode,
            snap.current_price,
            snap.unit,
            snap.base_amount,
            snap.base_value,
            snap.full_amount,
            snap.full_value,
            intent.profile,
            intent.risk_budget,
        ))
    }

    /// Confirm the parked plan and place the entry order. A failed entry
    /// placement tears the lifecycle down to IDLE.
    pub async fn confirm(&mut self) -> Result<()> {
        if self.state != LifecycleState::WaitConfirm {
            return Err(StrategyError::InvalidState {
                command: "confirm".to_string(),
                state: self.state.to_string(),
            });
        }
        let intent = match self.intent.clone() {
            Some(i) => i,
            None => {
                self.state = LifecycleState::Idle;
                return Err(StrategyError::InvalidState {
                    command: "confirm".to_string(),
                    state: "no pending plan".to_string(),
                });
            }
        };

        if let Err(e) = self.place_entry(&intent).await {
            error!("[{}] entry placement failed: {}", intent.symbol, e);
            // the failed submission may still have registered; sweep it
            self.teardown("entry placement failed", true).await;
            return Err(e);
        }

        if let Some(i) = self.intent.as_mut() {
            i.pending_confirm = None;
        }
        self.state = LifecycleState::WaitEntry;
        info!("[{}] entry placed, waiting for the base fill", intent.symbol);
        Ok(())
    }

    async fn place_entry(&self, intent: &PositionIntent) -> Result<()> {
        let side = intent.direction.entry_side();
        match intent.entry_mode {
            EntryMode::Market => {
                self.gateway
                    .place_market(&intent.symbol, side, intent.base_amount, &intent.spec)
                    .await?;
            }
            EntryMode::Limit => {
                let price = intent.limit_price.ok_or_else(|| {
                    StrategyError::Configuration("limit entry without a price".to_string())
                })?;
                self.gateway
                    .place_limit(&intent.symbol, side, intent.base_amount, price, false, &intent.spec)
                    .await?;
            }
            EntryMode::TrailingMarket => {
                let price = self.exchange.get_ticker(&intent.symbol).await?;
                let rate =
                    callback_rate_pct(self.config.entry_callback * intent.unit.value, price)?;
                self.gateway
                    .place_trailing_stop(
                        &intent.symbol,
                        side,
                        intent.base_amount,
                        rate,
                        None,
                        false,
                        &intent.spec,
                    )
                    .await?;
            }
            EntryMode::TrailingLimit => {
                let activation = intent.limit_price.ok_or_else(|| {
                    StrategyError::Configuration("trailing entry without an activation price".to_string())
                })?;
                let rate =
                    callback_rate_pct(self.config.entry_callback * intent.unit.value, activation)?;
                self.gateway
                    .place_trailing_stop(
                        &intent.symbol,
                        side,
                        intent.base_amount,
                        rate,
                        Some(activation),
                        false,
                        &intent.spec,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Abandon a lifecycle that has not opened a position yet
    pub async fn cancel(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::WaitConfirm | LifecycleState::WaitEntry => {
                info!("lifecycle cancelled in {}", self.state);
                // nothing is working yet in WAIT_CONFIRM, so skip the sweep
                let sweep = self.state == LifecycleState::WaitEntry;
                self.teardown("cancelled by operator", sweep).await;
                Ok(())
            }
            _ => Err(StrategyError::InvalidState {
                command: "cancel".to_string(),
                state: self.state.to_string(),
            }),
        }
    }

    /// Unconditionally cancel all working orders and return to IDLE.
    /// The escape hatch when the machine and the exchange disagree; it never
    /// touches the open position itself.
    pub async fn reset(&mut self) -> Result<()> {
        info!("manual reset from {}", self.state);
        self.teardown("manual reset", true).await;
        Ok(())
    }

    /// One observation cycle: read the position, react to size deltas.
    /// Read failures skip the cycle and are retried on the next poll.
    pub async fn poll(&mut self) {
        match self.state {
            LifecycleState::Idle | LifecycleState::WaitConfirm => return,
            _ => {}
        }
        let Some(intent) = self.intent.as_ref() else {
            self.state = LifecycleState::Idle;
            return;
        };
        let symbol = intent.symbol.clone();
        let direction = intent.direction;

        let observed = match self.exchange.get_position(&symbol, direction).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[{}] position read failed, skipping cycle: {}", symbol, e);
                return;
            }
        };
        let current = observed.map(|p| p.amount).unwrap_or(Decimal::ZERO);
        let avg_price = observed.map(|p| p.avg_price).unwrap_or(Decimal::ZERO);

        match self.state {
            LifecycleState::WaitEntry => self.poll_wait_entry(current, avg_price).await,
            LifecycleState::EntryDone => self.poll_entry_done(current).await,
            LifecycleState::WaitExit => self.poll_wait_exit(current).await,
            _ => {}
        }
    }

    async fn poll_wait_entry(&mut self, current: Decimal, avg_price: Decimal) {
        let Some(intent) = self.intent.as_ref() else { return };
        let tol = intent.spec.tolerance();
        let prev = intent.last_amount;

        if prev == Decimal::ZERO && (current - intent.base_amount).abs() < tol {
            let updated = {
                let i = match self.intent.as_mut() {
                    Some(i) => i,
                    None => return,
                };
                i.base_price = Some(avg_price);
                i.last_amount = current;
                i.clone()
            };
            self.state = LifecycleState::EntryDone;
            info!(
                "[{}] base filled: {} @ {}",
                updated.symbol, current, avg_price
            );
            self.notifier
                .notify(
                    "Base position filled",
                    &format!(
                        "{} {} {} @ {}",
                        updated.symbol, updated.direction, current, avg_price
                    ),
                )
                .await;
            self.place_base_stage(&updated, avg_price).await;
        } else if prev > Decimal::ZERO && current == Decimal::ZERO {
            // a partial entry appeared and then vanished; treat as aborted
            let symbol = intent.symbol.clone();
            warn!("[{}] entry position vanished, aborting lifecycle", symbol);
            self.notifier
                .notify("Entry aborted", &format!("{} position vanished before the base fill", symbol))
                .await;
            self.teardown("entry aborted", true).await;
        } else if let Some(i) = self.intent.as_mut() {
            i.last_amount = current;
        }
    }

    async fn poll_entry_done(&mut self, current: Decimal) {
        let Some(intent) = self.intent.as_ref() else { return };
        let tol = intent.spec.tolerance();
        let prev = intent.last_amount;

        if current == Decimal::ZERO {
            let (symbol, direction) = (intent.symbol.clone(), intent.direction);
            info!("[{}] base stage stopped out", symbol);
            let close = self.exchange.get_ticker(&symbol).await.ok();
            self.notifier
                .notify(
                    "Stopped out",
                    &format!(
                        "{} {} closed at base stage{}",
                        symbol,
                        direction,
                        price_suffix(close)
                    ),
                )
                .await;
            self.teardown("base stop hit", true).await;
        } else if (prev - intent.base_amount).abs() < tol
            && (current - intent.full_amount).abs() < tol
        {
            let updated = {
                let i = match self.intent.as_mut() {
                    Some(i) => i,
                    None => return,
                };
                i.last_amount = current;
                i.clone()
            };
            self.state = LifecycleState::WaitExit;
            let anchor = match updated.base_price {
                Some(p) => p,
                None => {
                    error!("[{}] add filled with no recorded base price", updated.symbol);
                    return;
                }
            };
            info!("[{}] add-on filled, position complete: {}", updated.symbol, current);
            self.notifier
                .notify(
                    "Position complete",
                    &format!("{} {} now {}", updated.symbol, updated.direction, current),
                )
                .await;
            self.place_full_stage(&updated, anchor).await;
        } else if let Some(i) = self.intent.as_mut() {
            i.last_amount = current;
        }
    }

    async fn poll_wait_exit(&mut self, current: Decimal) {
        let Some(intent) = self.intent.as_ref() else { return };

        if current == Decimal::ZERO {
            let (symbol, direction) = (intent.symbol.clone(), intent.direction);
            info!("[{}] lifecycle complete, position flat", symbol);
            let close = self.exchange.get_ticker(&symbol).await.ok();
            self.notifier
                .notify(
                    "Lifecycle complete",
                    &format!("{} {} fully closed{}", symbol, direction, price_suffix(close)),
                )
                .await;
            self.teardown("position closed", true).await;
            return;
        }

        if !intent.protective_placed {
            self.check_protective(current).await;
        }
        if let Some(i) = self.intent.as_mut() {
            i.last_amount = current;
        }
    }

    /// Base-stage working orders: the base stop and the add-on trigger.
    /// Failures here are logged and the lifecycle continues; the operator
    /// decides whether to reset.
    async fn place_base_stage(&self, intent: &PositionIntent, anchor: Decimal) {
        let unit = intent.unit.value;
        let stop_price = intent
            .direction
            .adverse(anchor, self.config.base_stop_atr * unit);
        if let Err(e) = self
            .gateway
            .place_stop_market(
                &intent.symbol,
                intent.direction.exit_side(),
                intent.base_amount,
                stop_price,
                true,
                &intent.spec,
            )
            .await
        {
            error!("[{}] base stop placement failed: {}", intent.symbol, e);
        }

        let add_amount = intent.spec.round_amount(intent.full_amount * self.config.add_position_pct);
        let add_price = intent
            .direction
            .favorable(anchor, self.config.add_trigger_atr * unit);
        if let Err(e) = self
            .gateway
            .place_stop_market(
                &intent.symbol,
                intent.direction.entry_side(),
                add_amount,
                add_price,
                false,
                &intent.spec,
            )
            .await
        {
            error!("[{}] add-on trigger placement failed: {}", intent.symbol, e);
        }
    }

    /// Full-stage exit legs: clear the base-stage orders, then place the full
    /// stop, the trailing take-profit and the ladder.
    async fn place_full_stage(&self, intent: &PositionIntent, anchor: Decimal) {
        if let Err(e) = self.gateway.cancel_all(&intent.symbol).await {
            error!("[{}] stale order sweep failed: {}", intent.symbol, e);
        }
        tokio::time::sleep(self.gateway.settle_delay()).await;

        let unit = intent.unit.value;
        let stop_price = intent
            .direction
            .adverse(anchor, self.config.full_stop_atr * unit);
        if let Err(e) = self
            .gateway
            .place_stop_market(
                &intent.symbol,
                intent.direction.exit_side(),
                intent.full_amount,
                stop_price,
                true,
                &intent.spec,
            )
            .await
        {
            error!("[{}] full stop placement failed: {}", intent.symbol, e);
        }

        self.place_trailing_exit(intent, anchor).await;
        self.place_ladder(intent, anchor).await;
    }

    async fn place_trailing_exit(&self, intent: &PositionIntent, anchor: Decimal) {
        let unit = intent.unit.value;
        let activation = intent.spec.round_price(
            intent
                .direction
                .favorable(anchor, self.config.trail_activation_atr * unit),
        );
        let rate = match callback_rate_pct(self.config.trail_callback_atr * unit, activation) {
            Ok(r) => r,
            Err(e) => {
                error!("[{}] trailing callback rate: {}", intent.symbol, e);
                return;
            }
        };
        if let Err(e) = self
            .gateway
            .place_trailing_stop(
                &intent.symbol,
                intent.direction.exit_side(),
                intent.full_amount,
                rate,
                Some(activation),
                true,
                &intent.spec,
            )
            .await
        {
            error!("[{}] trailing exit placement failed: {}", intent.symbol, e);
        }
    }

    async fn place_ladder(&self, intent: &PositionIntent, anchor: Decimal) {
        let unit = intent.unit.value;
        for leg in intent.profile.legs(&self.config) {
            let price = intent.direction.favorable(anchor, leg.atr_multiple * unit);
            let qty = intent.full_amount * leg.fraction;
            if let Err(e) = self
                .gateway
                .place_limit(
                    &intent.symbol,
                    intent.direction.exit_side(),
                    qty,
                    price,
                    true,
                    &intent.spec,
                )
                .await
            {
                error!("[{}] ladder leg at {} failed: {}", intent.symbol, price, e);
            }
        }
    }

    /// Once price has moved a trigger distance in favor, replace the whole
    /// exit set with one anchored on a tightened protective stop. Runs at
    /// most once per lifecycle; the armed flag stays set even when some legs
    /// fail, so a partial failure is an operator problem, not a re-fire.
    async fn check_protective(&mut self, current: Decimal) {
        let Some(intent) = self.intent.as_ref() else { return };
        let anchor = match intent.base_price {
            Some(p) => p,
            None => return,
        };
        let unit = intent.unit.value;
        let trigger = intent
            .direction
            .favorable(anchor, self.config.protective_trigger_atr * unit);

        let mark = match self.exchange.get_ticker(&intent.symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!("[{}] ticker read failed during protective check: {}", intent.symbol, e);
                return;
            }
        };
        if !intent.direction.reached(mark, trigger) {
            return;
        }

        let intent = {
            let i = match self.intent.as_mut() {
                Some(i) => i,
                None => return,
            };
            i.protective_placed = true;
            i.clone()
        };
        warn!(
            "[{}] protective trigger reached at {}; re-anchoring exits (briefly unprotected)",
            intent.symbol, mark
        );

        if let Err(e) = self.gateway.cancel_all(&intent.symbol).await {
            error!("[{}] exit sweep before re-anchor failed: {}", intent.symbol, e);
        }
        tokio::time::sleep(self.gateway.settle_delay()).await;

        // the tightened stop goes in first to shrink the unprotected window
        let stop_price = intent
            .direction
            .adverse(anchor, self.config.protective_offset_atr * unit);
        if let Err(e) = self
            .gateway
            .place_stop_market(
                &intent.symbol,
                intent.direction.exit_side(),
                current,
                stop_price,
                true,
                &intent.spec,
            )
            .await
        {
            error!("[{}] protective stop placement failed: {}", intent.symbol, e);
        }

        self.place_trailing_exit(&intent, anchor).await;
        self.place_ladder(&intent, anchor).await;

        self.notifier
            .notify(
                "Protective stop armed",
                &format!(
                    "{} {} stop tightened to {}",
                    intent.symbol,
                    intent.direction,
                    intent.spec.round_price(stop_price)
                ),
            )
            .await;
    }

    /// One-line operator status
    pub fn status(&self) -> String {
        match &self.intent {
            None => format!("state={}", self.state),
            Some(intent) => format!(
                "state={} symbol={} direction={} size={}/{} base_price={} unit={} protective={}",
                self.state,
                intent.symbol,
                intent.direction,
                intent.last_amount,
                intent.full_amount,
                intent
                    .base_price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                intent.unit,
                intent.protective_placed,
            ),
        }
    }

    /// Drop to IDLE; when `sweep` is set, cancel all working orders for the
    /// active symbol first.
    async fn teardown(&mut self, reason: &str, sweep: bool) {
        if sweep {
            if let Some(intent) = &self.intent {
                if let Err(e) = self.gateway.cancel_all(&intent.symbol).await {
                    error!(
                        "[{}] order cleanup failed during teardown ({}): {}",
                        intent.symbol, reason, e
                    );
                }
            }
        }
        debug!("lifecycle torn down: {}", reason);
        self.intent = None;
        self.state = LifecycleState::Idle;
    }
}

fn price_suffix(price: Option<Decimal>) -> String {
    price.map(|p| format!(" near {}", p)).unwrap_or_default()
}
