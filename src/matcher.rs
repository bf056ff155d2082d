//! Crossing decision for the best bid and best ask of one symbol.
//!
//! [`decide`] only looks at the two candidate orders and never touches
//! storage; committing the resulting [`Fill`] is the ledger's job.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::orders::{Order, OrderId};

/// What the matcher wants committed: one trade between a buy and a sell order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: u64,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NoMatch,
    Match(Fill),
}

/// Decides whether the best buy and best sell cross.
///
/// # Rules
/// - A match needs both orders and `buy.price >= sell.price`.
/// - The trade executes at the price of the order created first, i.e. the
///   resting order's price is honored. Equal timestamps use the buy price.
/// - The quantity is `min(buy.remaining, sell.remaining)`; a zero quantity
///   (stale or already-filled read) is treated as no match.
///
/// # Example
/// - A buy at 60000 rests, then a sell at 50000 arrives.
/// - They cross and trade at 60000, the earlier order's price.
pub fn decide(best_buy: Option<&Order>, best_sell: Option<&Order>) -> MatchOutcome {
    let (Some(buy), Some(sell)) = (best_buy, best_sell) else {
        return MatchOutcome::NoMatch;
    };

    if buy.price < sell.price {
        return MatchOutcome::NoMatch;
    }

    let quantity = buy.remaining.min(sell.remaining);
    if quantity == 0 {
        return MatchOutcome::NoMatch;
    }

    let price = if sell.created_at < buy.created_at {
        sell.price
    } else {
        buy.price
    };

    MatchOutcome::Match(Fill {
        price,
        quantity,
        buy_order_id: buy.id,
        sell_order_id: sell.id,
    })
}
