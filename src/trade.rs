use std::time::SystemTime;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::orders::OrderId;

/// A trade represents a matched transaction between a buy and a sell order.
///
/// # Behavior
/// - The trade executes at the price of whichever order was created first
///   (the resting order). On an exact timestamp tie, the buy order's price is used.
/// - Partial fills may occur: one order can take part in many trades.
/// - Trades are append-only facts; once recorded they are never updated or removed.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Decimal,
    pub quantity: u64,
    #[serde(with = "crate::utils::unix_millis")]
    pub timestamp: SystemTime,
}
