//! Two-threshold buy-then-sell strategy
//!
//! Holds no position while `target_sell_price` is absent; once a buy fills,
//! the target is the buy reference price times the profitability multiplier.
//! Decisions are made synchronously per tick, one decision per tick, with
//! inclusive comparisons on both thresholds. The strategy knows nothing
//! about the order gate's lock: ticks arriving while an order is in flight
//! are still evaluated, and the gate's drop is the only de-duplication.

use crate::types::Action;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

/// When the sell target is cleared.
///
/// Under `OnAttempt` a failed sell order leaves the position considered
/// closed, which is asymmetric with the buy path (the target is only set
/// after a confirmed buy). `OnFill` makes the two paths symmetric by
/// clearing only after a confirmed sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Clear the target when the sell decision is emitted (optimistic reset:
    /// a failed sell never leaves the bot stuck waiting on a stale target)
    #[default]
    OnAttempt,
    /// Clear the target only once the sell order confirms
    OnFill,
}

impl FromStr for ResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-attempt" => Ok(ResetPolicy::OnAttempt),
            "on-fill" => Ok(ResetPolicy::OnFill),
            other => Err(format!(
                "expected \"on-attempt\" or \"on-fill\", got {:?}",
                other
            )),
        }
    }
}

/// Per-pair strategy state
#[derive(Debug)]
pub struct StrategyState {
    target_sell_price: Option<Decimal>,
    buy_threshold: Decimal,
    profitability: Decimal,
    reset_policy: ResetPolicy,
}

impl StrategyState {
    pub fn new(buy_threshold: Decimal, profitability: Decimal, reset_policy: ResetPolicy) -> Self {
        Self {
            target_sell_price: None,
            buy_threshold,
            profitability,
            reset_policy,
        }
    }

    /// Current sell target, absent while no position is held
    pub fn target_sell_price(&self) -> Option<Decimal> {
        self.target_sell_price
    }

    /// Evaluate one tick. Exactly one of buy-eligible, sell-eligible, or
    /// neither holds per evaluation.
    pub fn on_tick(&mut self, price: Decimal) -> Action {
        match self.target_sell_price {
            None if price <= self.buy_threshold => {
                info!(
                    "[STRATEGY] buy condition met ({} <= {})",
                    price, self.buy_threshold
                );
                Action::Buy
            }
            Some(target) if price >= target => {
                info!("[STRATEGY] sell condition met ({} >= {})", price, target);
                if self.reset_policy == ResetPolicy::OnAttempt {
                    self.target_sell_price = None;
                }
                Action::Sell
            }
            _ => Action::None,
        }
    }

    /// Set the sell target after a confirmed buy. `reference_price` is the
    /// tick price that triggered the buy, threaded through the order path.
    pub fn set_target_from_fill(&mut self, reference_price: Decimal) {
        let target = reference_price * self.profitability;
        info!("[STRATEGY] new sell target: {}", target);
        self.target_sell_price = Some(target);
    }

    /// Clear the target after a confirmed sell. A no-op under
    /// [`ResetPolicy::OnAttempt`], where the decision already cleared it.
    pub fn confirm_sell(&mut self) {
        self.target_sell_price = None;
    }
}
