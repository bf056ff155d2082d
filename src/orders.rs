use std::{fmt, str::FromStr, time::SystemTime};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ConflictError, ValidationError};

pub type OrderId = Uuid;

/// Represents which side of the market the order is on.
///
/// # Intuition
/// - `Buy` (Bid): the trader wants to purchase the base asset. The best bid is the
///   **highest** price, since a higher price means more willingness to buy.
/// - `Sell` (Ask): the trader wants to sell the base asset. The best ask is the
///   **lowest** price.
///
/// Orders cross when the best bid is at or above the best ask.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum Side {
    Buy,  // Bid
    Sell, // Ask
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; anything other than buy/sell is rejected at the boundary.
impl FromStr for Side {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(ValidationError::UnknownSide(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum OrderStatus {
    /// Remaining quantity > 0; eligible for matching.
    Pending,
    /// Remaining quantity == 0. Terminal.
    Filled,
}

/// A limit order as submitted by an account, before it has an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice);
        }
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        Ok(())
    }

    /// Assigns identity and creation time. The order starts `Pending` with
    /// `remaining == quantity`.
    pub fn into_order(self, id: OrderId, created_at: SystemTime) -> Order {
        Order {
            id,
            account_id: self.account_id,
            symbol: self.symbol,
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            remaining: self.quantity,
            status: OrderStatus::Pending,
            created_at,
        }
    }
}

/// A resting limit order.
///
/// - `price` and `quantity` never change after creation
/// - `remaining` only decreases, and never exceeds `quantity`
/// - `created_at` is used for time priority (FIFO within a price level) and
///   decides whose price a trade executes at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
    pub remaining: u64,
    pub status: OrderStatus,
    #[serde(with = "crate::utils::unix_millis")]
    pub created_at: SystemTime,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Consumes `qty` from the remaining quantity, flipping to `Filled` at zero.
    pub fn fill(&mut self, qty: u64) -> Result<(), ConflictError> {
        if qty > self.remaining {
            return Err(ConflictError::Overfill {
                order_id: self.id,
                remaining: self.remaining,
                requested: qty,
            });
        }
        self.remaining -= qty;
        if self.remaining == 0 {
            self.status = OrderStatus::Filled;
        }
        Ok(())
    }
}
