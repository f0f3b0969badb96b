//! Core types for the trading bot

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type. Only market orders are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// Order submission payload for the exchange, built per submission
/// and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Quantity in the base asset, serialized as a string per the v4 API
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
}

/// Per-tick decision from the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Buy,
    Sell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_order_request_wire_format() {
        let request = OrderRequest {
            qty: dec!(0.001),
            side: Side::Buy,
            order_type: OrderType::Market,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["qty"], "0.001");
        assert_eq!(json["side"], "buy");
        assert_eq!(json["type"], "market");
    }
}
