use std::collections::HashMap;
use std::sync::Arc;

use catalyst_cache::PositionsStore;
use catalyst_models::{Clock, ExitReason, ManagedPosition, Order};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::error::TradingError;

/// Wraps `PositionsStore` with a per-ticker async mutex so that a price
/// update + exit check for one ticker never interleaves with an order
/// submission for the same ticker (spec.md §5).
pub struct PositionManager {
    store: Mutex<PositionsStore>,
    ticker_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    clock: Arc<dyn Clock>,
}

impl PositionManager {
    pub fn new(store: PositionsStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(store),
            ticker_locks: Mutex::new(HashMap::new()),
            clock,
        }
    }

    async fn lock_for(&self, ticker: &str) -> Arc<Mutex<()>> {
        let mut locks = self.ticker_locks.lock().await;
        locks
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn open_position(
        &self,
        filled_order: &Order,
        stop: Option<Decimal>,
        target: Option<Decimal>,
        signal_id: Option<Uuid>,
        strategy: impl Into<String>,
    ) -> Result<ManagedPosition, TradingError> {
        let ticker_lock = self.lock_for(&filled_order.ticker).await;
        let _guard = ticker_lock.lock().await;

        let entry_price = filled_order.limit_price.unwrap_or(filled_order.stop_price.unwrap_or_default());
        let position = ManagedPosition::open(
            filled_order.ticker.clone(),
            filled_order.filled_quantity,
            matches!(filled_order.side, catalyst_models::OrderSide::Sell),
            entry_price,
            stop,
            target,
            Some(filled_order.order_id),
            signal_id,
            strategy,
            self.clock.now_utc(),
        );
        self.store.lock().await.upsert_open(&position)?;
        info!(ticker = %position.ticker, position_id = %position.position_id, "position opened");
        Ok(position)
    }

    /// Recomputes `current_price`/`market_value`/`unrealized_pnl` for every
    /// open position whose ticker is present in `price_map`. Missing prices
    /// are skipped, not zeroed. Returns the count of positions updated.
    pub async fn update_position_prices(&self, price_map: &HashMap<String, Decimal>) -> Result<usize, TradingError> {
        let mut updated = 0;
        let all_open = {
            let store = self.store.lock().await;
            store.list_all_open()?
        };
        for mut position in all_open {
            let Some(price) = price_map.get(&position.ticker) else {
                continue;
            };
            let ticker_lock = self.lock_for(&position.ticker).await;
            let _guard = ticker_lock.lock().await;
            position.reprice(*price, self.clock.now_utc());
            self.store.lock().await.upsert_open(&position)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Evaluates every open position for an exit in the fixed priority order
    /// of spec.md §4.12: stop, then target, then max-hold-time. Exits are
    /// processed one ticker at a time under that ticker's lock so a position
    /// can never be closed twice.
    pub async fn check_and_execute_exits(
        &self,
        broker: &dyn Broker,
        max_hold_hours: u64,
    ) -> Result<Vec<catalyst_models::ClosedPosition>, TradingError> {
        let all_open = {
            let store = self.store.lock().await;
            store.list_all_open()?
        };

        let mut closed = Vec::new();
        for position in all_open {
            let ticker_lock = self.lock_for(&position.ticker).await;
            let _guard = ticker_lock.lock().await;

            let Some(reason) = exit_reason(&position, self.clock.now_utc(), max_hold_hours) else {
                continue;
            };

            let close_result = broker.close_position(&position.ticker, Some(position.quantity)).await;
            let order = match close_result {
                Ok(order) => order,
                Err(e) => {
                    warn!(ticker = %position.ticker, error = %e, "broker close_position failed");
                    continue;
                }
            };
            let exit_price = order.limit_price.unwrap_or(position.current_price);
            let position_id = position.position_id;
            let closed_position = position.close(exit_price, reason, Some(order.order_id), self.clock.now_utc());

            self.store.lock().await.close(position_id, &closed_position)?;
            info!(
                ticker = %closed_position.ticker,
                reason = ?closed_position.exit_reason,
                realized_pnl = %closed_position.realized_pnl,
                "position closed"
            );
            closed.push(closed_position);
        }
        Ok(closed)
    }
}

fn exit_reason(position: &ManagedPosition, now: chrono::DateTime<chrono::Utc>, max_hold_hours: u64) -> Option<ExitReason> {
    if let Some(stop) = position.stop_loss_price {
        let hit = if position.is_short {
            position.current_price >= stop
        } else {
            position.current_price <= stop
        };
        if hit {
            return Some(ExitReason::StopLoss);
        }
    }
    if let Some(target) = position.take_profit_price {
        let hit = if position.is_short {
            position.current_price <= target
        } else {
            position.current_price >= target
        };
        if hit {
            return Some(ExitReason::TakeProfit);
        }
    }
    let held_hours = (now - position.opened_at).num_seconds() as f64 / 3600.0;
    if held_hours >= max_hold_hours as f64 {
        return Some(ExitReason::MaxHoldTime);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::mock::MockBroker;
    use catalyst_models::{Account, FrozenClock, OrderSide, OrderStatus, OrderType, TimeInForce};
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn frozen(ts: &str) -> Arc<dyn Clock> {
        let ts: DateTime<Utc> = ts.parse().unwrap();
        Arc::new(FrozenClock(ts))
    }

    fn filled_order(ticker: &str, side: OrderSide, price: Decimal) -> Order {
        let now = Utc::now();
        Order {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            ticker: ticker.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: dec!(100),
            filled_quantity: dec!(100),
            limit_price: Some(price),
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            status: OrderStatus::Filled,
            submitted_at: now,
            updated_at: now,
            extended_hours: false,
        }
    }

    #[tokio::test]
    async fn open_then_reprice_matches_invariant() {
        let manager = PositionManager::new(PositionsStore::open_in_memory().unwrap(), frozen("2024-01-10T15:00:00Z"));
        let order = filled_order("AAPL", OrderSide::Buy, dec!(10.00));
        manager.open_position(&order, Some(dec!(9.50)), Some(dec!(11.00)), None, "fda_catalyst").await.unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(10.50));
        let updated = manager.update_position_prices(&prices).await.unwrap();
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn stop_loss_hit_closes_with_correct_pnl() {
        // spec.md §8 scenario 4.
        let manager = PositionManager::new(PositionsStore::open_in_memory().unwrap(), frozen("2024-01-10T15:00:00Z"));
        let order = filled_order("AAPL", OrderSide::Buy, dec!(10.00));
        manager.open_position(&order, Some(dec!(9.50)), None, None, "fda_catalyst").await.unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(9.49));
        manager.update_position_prices(&prices).await.unwrap();

        let broker = MockBroker::new(Account { equity: dec!(10000), cash: dec!(10000), buying_power: dec!(10000) }, true);
        let closed = manager.check_and_execute_exits(&broker, 72).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].exit_reason, ExitReason::StopLoss);
    }

    #[tokio::test]
    async fn missing_price_is_skipped_not_zeroed() {
        let manager = PositionManager::new(PositionsStore::open_in_memory().unwrap(), frozen("2024-01-10T15:00:00Z"));
        let order = filled_order("AAPL", OrderSide::Buy, dec!(10.00));
        manager.open_position(&order, None, None, None, "manual").await.unwrap();

        let prices = HashMap::new();
        let updated = manager.update_position_prices(&prices).await.unwrap();
        assert_eq!(updated, 0);
    }
}
