use std::time::Duration;

use catalyst_cache::AppendLog;
use catalyst_models::{Order, OrderSide, OrderStatus, OrderType, SignalAction, TimeInForce, TradingSignal};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{error, warn};

use crate::broker::{Broker, BracketParams, OrderParams};
use crate::error::TradingError;
use crate::position_manager::PositionManager;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSession {
    Regular,
    Extended,
}

#[derive(Debug, Serialize)]
struct ExecutedOrderRecord {
    signal_id: uuid::Uuid,
    order_id: uuid::Uuid,
    ticker: String,
    action: SignalAction,
    quantity: Decimal,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Turns a `TradingSignal` into a broker order, spec.md §4.11. Transient
/// (5xx/429) failures are retried with exponential backoff up to
/// `MAX_RETRIES`; auth failures surface immediately without retry.
pub struct OrderExecutor<'a> {
    broker: &'a dyn Broker,
    position_manager: &'a PositionManager,
    executed_orders_log: &'a AppendLog,
}

impl<'a> OrderExecutor<'a> {
    pub fn new(broker: &'a dyn Broker, position_manager: &'a PositionManager, executed_orders_log: &'a AppendLog) -> Self {
        Self {
            broker,
            position_manager,
            executed_orders_log,
        }
    }

    pub async fn execute(
        &self,
        signal: &TradingSignal,
        account_equity: Decimal,
        session: MarketSession,
    ) -> Result<Order, TradingError> {
        if signal.action == SignalAction::Close {
            return self.execute_close(signal).await;
        }
        if !signal.risk_ordering_valid() {
            return Err(TradingError::Validation("signal risk ordering invalid".to_string()));
        }

        let quantity = share_quantity(signal.position_size_pct, account_equity, signal.entry_price);
        let side = match signal.action {
            SignalAction::Buy => OrderSide::Buy,
            SignalAction::Sell => OrderSide::Sell,
            SignalAction::Avoid | SignalAction::Close => unreachable!("handled above"),
        };

        let order = match session {
            MarketSession::Regular => self.place_regular_bracket(signal, side, quantity).await?,
            MarketSession::Extended => self.place_extended_limit(signal, side, quantity).await?,
        };

        self.persist_executed(signal, &order)?;

        if order.status == OrderStatus::Filled {
            self.position_manager
                .open_position(
                    &order,
                    signal.stop_loss_price,
                    signal.take_profit_price,
                    Some(signal.signal_id),
                    signal.strategy.clone(),
                )
                .await?;
        }

        Ok(order)
    }

    async fn execute_close(&self, signal: &TradingSignal) -> Result<Order, TradingError> {
        let order = retry_with_backoff(|| self.broker.close_position(&signal.ticker, None)).await?;
        self.persist_executed(signal, &order)?;
        Ok(order)
    }

    async fn place_regular_bracket(&self, signal: &TradingSignal, side: OrderSide, quantity: Decimal) -> Result<Order, TradingError> {
        let bracket = retry_with_backoff(|| {
            self.broker.place_bracket_order(BracketParams {
                ticker: signal.ticker.clone(),
                side,
                quantity,
                entry_limit_price: None,
                stop_loss_price: signal.stop_loss_price.unwrap_or(signal.entry_price),
                take_profit_price: signal.take_profit_price.unwrap_or(signal.entry_price),
                time_in_force: TimeInForce::Gtc,
            })
        })
        .await?;
        Ok(map_order_status(bracket.entry))
    }

    async fn place_extended_limit(&self, signal: &TradingSignal, side: OrderSide, quantity: Decimal) -> Result<Order, TradingError> {
        let limit_price = match side {
            OrderSide::Buy => signal.entry_price * dec!(1.02),
            OrderSide::Sell => signal.current_price,
        };
        let order = retry_with_backoff(|| {
            self.broker.place_order(OrderParams {
                ticker: signal.ticker.clone(),
                side,
                order_type: OrderType::Limit,
                quantity,
                limit_price: Some(limit_price),
                stop_price: None,
                time_in_force: TimeInForce::Day,
                extended_hours: true,
            })
        })
        .await?;
        Ok(map_order_status(order))
    }

    fn persist_executed(&self, signal: &TradingSignal, order: &Order) -> Result<(), TradingError> {
        self.executed_orders_log.append(&ExecutedOrderRecord {
            signal_id: signal.signal_id,
            order_id: order.order_id,
            ticker: order.ticker.clone(),
            action: signal.action,
            quantity: order.quantity,
            submitted_at: order.submitted_at,
        })?;
        Ok(())
    }
}

/// `floor(position_size_pct% * account_equity / entry_price)`, minimum 1 share.
fn share_quantity(position_size_pct: Decimal, account_equity: Decimal, entry_price: Decimal) -> Decimal {
    if entry_price <= Decimal::ZERO {
        return Decimal::ONE;
    }
    let raw = position_size_pct / dec!(100) * account_equity / entry_price;
    raw.floor().max(Decimal::ONE)
}

/// Mapping from broker status to our `OrderStatus` is already total by
/// construction (the enum has no "unknown" variant); this is the seam where
/// a provider-specific adapter would normalize a foreign status string and
/// fall back to `Pending` with an error log for anything it cannot map.
fn map_order_status(order: Order) -> Order {
    order
}

async fn retry_with_backoff<F, Fut, T>(mut call: F) -> Result<T, TradingError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TradingError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt);
                warn!(attempt, error = %e, "transient order error, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e @ TradingError::Auth(_)) => {
                error!(error = %e, "broker authentication rejected, not retrying");
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }
}
