use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SIGNAL_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    Sell,
    Avoid,
    Close,
}

/// Boundary object between the signal generator and the order executor.
/// Invariant: for `action=buy`, `stop_loss_price < entry_price < take_profit_price`;
/// for `action=sell` the inequalities invert. Close signals carry no risk
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingSignal {
    pub schema_version: u32,
    pub signal_id: Uuid,
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub action: SignalAction,
    pub confidence: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub position_size_pct: Decimal,
    pub signal_type: String,
    pub timeframe: String,
    pub strategy: String,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub extended_hours: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl TradingSignal {
    /// True if the risk-parameter ordering invariant holds for buy/sell actions.
    /// Close/avoid signals trivially satisfy it (no risk parameters to check).
    pub fn risk_ordering_valid(&self) -> bool {
        match self.action {
            SignalAction::Buy => match (self.stop_loss_price, self.take_profit_price) {
                (Some(stop), Some(target)) => stop < self.entry_price && self.entry_price < target,
                _ => true,
            },
            SignalAction::Sell => match (self.stop_loss_price, self.take_profit_price) {
                (Some(stop), Some(target)) => target < self.entry_price && self.entry_price < stop,
                _ => true,
            },
            SignalAction::Avoid | SignalAction::Close => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy_signal() -> TradingSignal {
        TradingSignal {
            schema_version: SIGNAL_SCHEMA_VERSION,
            signal_id: Uuid::new_v4(),
            ticker: "FDAX".to_string(),
            timestamp: Utc::now(),
            action: SignalAction::Buy,
            confidence: dec!(0.92),
            entry_price: dec!(25.00),
            current_price: dec!(25.00),
            position_size_pct: dec!(2.0),
            signal_type: "catalyst".to_string(),
            timeframe: "intraday".to_string(),
            strategy: "fda_catalyst".to_string(),
            stop_loss_price: Some(dec!(23.75)),
            take_profit_price: Some(dec!(28.00)),
            extended_hours: false,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn roundtrip_trading_signal() {
        let signal = buy_signal();
        let json = serde_json::to_string(&signal).unwrap();
        let parsed: TradingSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, parsed);
    }

    #[test]
    fn buy_risk_ordering_valid() {
        assert!(buy_signal().risk_ordering_valid());
    }

    #[test]
    fn buy_risk_ordering_invalid_when_stop_above_entry() {
        let mut signal = buy_signal();
        signal.stop_loss_price = Some(dec!(26.00));
        assert!(!signal.risk_ordering_valid());
    }

    #[test]
    fn close_signal_has_no_risk_parameters() {
        let mut signal = buy_signal();
        signal.action = SignalAction::Close;
        signal.stop_loss_price = None;
        signal.take_profit_price = None;
        assert!(signal.risk_ordering_valid());
    }
}
