use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Manual,
    MaxHoldTime,
}

/// Process-wide mutable state, exclusively owned and mutated by the position
/// manager. `quantity` is always positive; direction is inferred from the
/// originating signal action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagedPosition {
    pub position_id: Uuid,
    pub ticker: String,
    pub quantity: Decimal,
    pub is_short: bool,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub entry_order_id: Option<Uuid>,
    pub signal_id: Option<Uuid>,
    pub strategy: String,
}

impl ManagedPosition {
    pub fn open(
        ticker: impl Into<String>,
        quantity: Decimal,
        is_short: bool,
        entry_price: Decimal,
        stop_loss_price: Option<Decimal>,
        take_profit_price: Option<Decimal>,
        entry_order_id: Option<Uuid>,
        signal_id: Option<Uuid>,
        strategy: impl Into<String>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let cost_basis = entry_price * quantity;
        Self {
            position_id: Uuid::new_v4(),
            ticker: ticker.into(),
            quantity,
            is_short,
            entry_price,
            current_price: entry_price,
            cost_basis,
            market_value: cost_basis,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            stop_loss_price,
            take_profit_price,
            opened_at,
            updated_at: opened_at,
            entry_order_id,
            signal_id,
            strategy: strategy.into(),
        }
    }

    /// Recompute `market_value`/`unrealized_pnl`/`unrealized_pnl_pct` for a new
    /// price. Invariant (spec.md §8): `market_value = current_price * quantity`
    /// and `unrealized_pnl = market_value - cost_basis`.
    pub fn reprice(&mut self, price: Decimal, now: DateTime<Utc>) {
        self.current_price = price;
        self.market_value = price * self.quantity;
        self.unrealized_pnl = if self.is_short {
            self.cost_basis - self.market_value
        } else {
            self.market_value - self.cost_basis
        };
        self.unrealized_pnl_pct = if self.cost_basis != Decimal::ZERO {
            self.unrealized_pnl / self.cost_basis * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        self.updated_at = now;
    }

    pub fn close(
        self,
        exit_price: Decimal,
        exit_reason: ExitReason,
        exit_order_id: Option<Uuid>,
        closed_at: DateTime<Utc>,
    ) -> ClosedPosition {
        let realized_pnl = if self.is_short {
            (self.entry_price - exit_price) * self.quantity
        } else {
            (exit_price - self.entry_price) * self.quantity
        };
        let realized_pnl_pct = if self.cost_basis != Decimal::ZERO {
            realized_pnl / self.cost_basis * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let hold_duration_seconds = (closed_at - self.opened_at).num_seconds().max(0) as u64;

        ClosedPosition {
            position_id: self.position_id,
            ticker: self.ticker,
            quantity: self.quantity,
            is_short: self.is_short,
            entry_price: self.entry_price,
            exit_price,
            cost_basis: self.cost_basis,
            realized_pnl,
            realized_pnl_pct,
            opened_at: self.opened_at,
            closed_at,
            hold_duration_seconds,
            exit_reason,
            entry_order_id: self.entry_order_id,
            exit_order_id,
            signal_id: self.signal_id,
            strategy: self.strategy,
        }
    }
}

/// Same identity as a `ManagedPosition` at the moment it was closed.
/// Closed positions are append-only; open positions are mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedPosition {
    pub position_id: Uuid,
    pub ticker: String,
    pub quantity: Decimal,
    pub is_short: bool,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub cost_basis: Decimal,
    pub realized_pnl: Decimal,
    pub realized_pnl_pct: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub hold_duration_seconds: u64,
    pub exit_reason: ExitReason,
    pub entry_order_id: Option<Uuid>,
    pub exit_order_id: Option<Uuid>,
    pub signal_id: Option<Uuid>,
    pub strategy: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reprice_recomputes_market_value_and_pnl() {
        let mut pos = ManagedPosition::open(
            "AAPL",
            dec!(100),
            false,
            dec!(10.00),
            Some(dec!(9.50)),
            Some(dec!(11.00)),
            None,
            None,
            "fda_catalyst",
            Utc::now(),
        );
        pos.reprice(dec!(10.50), Utc::now());
        assert_eq!(pos.market_value, dec!(1050.00));
        assert_eq!(pos.unrealized_pnl, dec!(50.00));
    }

    #[test]
    fn stop_loss_exit_matches_scenario() {
        // Spec.md §8 scenario 4: long at $10.00 qty 100, stop $9.50.
        let mut pos = ManagedPosition::open(
            "AAPL",
            dec!(100),
            false,
            dec!(10.00),
            Some(dec!(9.50)),
            None,
            None,
            None,
            "fda_catalyst",
            Utc::now(),
        );
        pos.reprice(dec!(9.49), Utc::now());
        let closed = pos.close(dec!(9.49), ExitReason::StopLoss, None, Utc::now());
        assert_eq!(closed.realized_pnl, dec!(-51.00));
        assert_eq!(closed.exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn open_then_close_at_entry_price_has_zero_pnl() {
        let pos = ManagedPosition::open(
            "AAPL",
            dec!(50),
            false,
            dec!(20.00),
            None,
            None,
            None,
            None,
            "manual",
            Utc::now(),
        );
        let closed = pos.close(dec!(20.00), ExitReason::Manual, None, Utc::now());
        assert_eq!(closed.realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn short_position_pnl_inverts() {
        let pos = ManagedPosition::open(
            "AAPL",
            dec!(10),
            true,
            dec!(20.00),
            Some(dec!(22.00)),
            Some(dec!(16.00)),
            None,
            None,
            "distress_short",
            Utc::now(),
        );
        let closed = pos.close(dec!(16.00), ExitReason::TakeProfit, None, Utc::now());
        assert_eq!(closed.realized_pnl, dec!(40.00));
    }
}
