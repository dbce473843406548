use async_trait::async_trait;
use catalyst_models::{
    Account, BracketOrder, BrokerPosition, MarketClock, Order, OrderSide, OrderStatus, OrderType,
    TimeInForce,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::TradingError;

/// Parameters for a single (non-bracket) order.
#[derive(Debug, Clone)]
pub struct OrderParams {
    pub ticker: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub extended_hours: bool,
}

/// Parameters for an entry order plus its stop-loss/take-profit children.
#[derive(Debug, Clone)]
pub struct BracketParams {
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_limit_price: Option<Decimal>,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub time_in_force: TimeInForce,
}

/// Abstract broker interface, spec.md §6. Every implementation maps its
/// provider's wire vocabulary onto `Order`/`OrderStatus`/`OrderType` totally —
/// an unmapped provider status is never silently dropped, it is logged at
/// error and mapped to `OrderStatus::Pending` by the order executor.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn connect(&self) -> Result<(), TradingError>;
    async fn disconnect(&self) -> Result<(), TradingError>;
    fn is_connected(&self) -> bool;

    async fn get_account(&self) -> Result<Account, TradingError>;
    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, TradingError>;
    async fn get_position(&self, ticker: &str) -> Result<Option<BrokerPosition>, TradingError>;
    async fn close_position(&self, ticker: &str, qty: Option<Decimal>) -> Result<Order, TradingError>;

    async fn place_order(&self, params: OrderParams) -> Result<Order, TradingError>;
    async fn place_bracket_order(&self, params: BracketParams) -> Result<BracketOrder, TradingError>;
    async fn cancel_order(&self, order_id: Uuid) -> Result<(), TradingError>;
    async fn cancel_all_orders(&self) -> Result<u32, TradingError>;
    async fn get_order(&self, order_id: Uuid) -> Result<Order, TradingError>;
    async fn get_orders(&self, status: Option<OrderStatus>, limit: u32) -> Result<Vec<Order>, TradingError>;

    async fn get_clock(&self) -> Result<MarketClock, TradingError>;
    async fn is_market_open(&self) -> Result<bool, TradingError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory broker double. Every `place_*` call fills immediately at the
    /// requested (or limit) price, mirroring the teacher's test doubles that
    /// always resolve deterministically rather than simulating latency.
    pub struct MockBroker {
        connected: Mutex<bool>,
        account: Account,
        orders: Mutex<Vec<Order>>,
        market_open: bool,
    }

    impl MockBroker {
        pub fn new(account: Account, market_open: bool) -> Self {
            Self {
                connected: Mutex::new(false),
                account,
                orders: Mutex::new(Vec::new()),
                market_open,
            }
        }

        fn fill(&self, params: &OrderParams) -> Order {
            let now = Utc::now();
            let order = Order {
                order_id: Uuid::new_v4(),
                client_order_id: None,
                ticker: params.ticker.clone(),
                side: params.side,
                order_type: params.order_type,
                quantity: params.quantity,
                filled_quantity: params.quantity,
                limit_price: params.limit_price,
                stop_price: params.stop_price,
                time_in_force: params.time_in_force,
                status: OrderStatus::Filled,
                submitted_at: now,
                updated_at: now,
                extended_hours: params.extended_hours,
            };
            self.orders.lock().unwrap().push(order.clone());
            order
        }
    }

    #[async_trait]
    impl Broker for MockBroker {
        async fn connect(&self) -> Result<(), TradingError> {
            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TradingError> {
            *self.connected.lock().unwrap() = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        async fn get_account(&self) -> Result<Account, TradingError> {
            Ok(self.account.clone())
        }

        async fn get_positions(&self) -> Result<Vec<BrokerPosition>, TradingError> {
            Ok(Vec::new())
        }

        async fn get_position(&self, _ticker: &str) -> Result<Option<BrokerPosition>, TradingError> {
            Ok(None)
        }

        async fn close_position(&self, ticker: &str, qty: Option<Decimal>) -> Result<Order, TradingError> {
            self.place_order(OrderParams {
                ticker: ticker.to_string(),
                side: OrderSide::Sell,
                order_type: OrderType::Market,
                quantity: qty.unwrap_or(Decimal::ONE),
                limit_price: None,
                stop_price: None,
                time_in_force: TimeInForce::Day,
                extended_hours: false,
            })
            .await
        }

        async fn place_order(&self, params: OrderParams) -> Result<Order, TradingError> {
            Ok(self.fill(&params))
        }

        async fn place_bracket_order(&self, params: BracketParams) -> Result<BracketOrder, TradingError> {
            let entry = self.fill(&OrderParams {
                ticker: params.ticker.clone(),
                side: params.side,
                order_type: if params.entry_limit_price.is_some() {
                    OrderType::Limit
                } else {
                    OrderType::Market
                },
                quantity: params.quantity,
                limit_price: params.entry_limit_price,
                stop_price: None,
                time_in_force: params.time_in_force,
                extended_hours: false,
            });
            Ok(BracketOrder {
                entry,
                stop_loss: None,
                take_profit: None,
            })
        }

        async fn cancel_order(&self, order_id: Uuid) -> Result<(), TradingError> {
            let mut orders = self.orders.lock().unwrap();
            let found = orders.iter_mut().find(|o| o.order_id == order_id);
            match found {
                Some(order) => {
                    order.status = OrderStatus::Cancelled;
                    Ok(())
                }
                None => Err(TradingError::OrderNotFound(order_id.to_string())),
            }
        }

        async fn cancel_all_orders(&self) -> Result<u32, TradingError> {
            let mut orders = self.orders.lock().unwrap();
            let mut count = 0;
            for order in orders.iter_mut() {
                if order.status != OrderStatus::Filled {
                    order.status = OrderStatus::Cancelled;
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn get_order(&self, order_id: Uuid) -> Result<Order, TradingError> {
            self.orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.order_id == order_id)
                .cloned()
                .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))
        }

        async fn get_orders(&self, status: Option<OrderStatus>, limit: u32) -> Result<Vec<Order>, TradingError> {
            let orders = self.orders.lock().unwrap();
            Ok(orders
                .iter()
                .filter(|o| match status {
                    Some(s) => s == o.status,
                    None => true,
                })
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn get_clock(&self) -> Result<MarketClock, TradingError> {
            let now = Utc::now();
            Ok(MarketClock {
                is_open: self.market_open,
                next_open: now,
                next_close: now,
            })
        }

        async fn is_market_open(&self) -> Result<bool, TradingError> {
            Ok(self.market_open)
        }
    }
}
