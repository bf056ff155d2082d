//! Persistence contracts the matching core is written against.
//!
//! [`crate::store::Store`] implements both traits on parity-db. The engine is
//! generic over them so the scheduler can be driven against other backends.

use crate::{
    errors::EngineResult,
    matcher::Fill,
    orderbook::BookLevel,
    orders::{NewOrder, Order, OrderId, Side},
    trade::Trade,
};

pub trait OrderRepository: Send + Sync {
    /// Validates and persists a new `Pending` order, returning it with its
    /// generated id and creation time. Invalid input persists nothing.
    fn create_order(&self, order: NewOrder) -> EngineResult<Order>;

    fn get_order(&self, id: OrderId) -> EngineResult<Option<Order>>;

    /// Highest-priced pending buy, earliest created among equals.
    fn best_buy(&self, symbol: &str) -> EngineResult<Option<Order>>;

    /// Lowest-priced pending sell, earliest created among equals.
    fn best_sell(&self, symbol: &str) -> EngineResult<Option<Order>>;

    /// Pending quantity per price, best price first, at most `limit` levels.
    fn depth_levels(&self, symbol: &str, side: Side, limit: usize) -> EngineResult<Vec<BookLevel>>;
}

pub trait TradeLedger: Send + Sync {
    /// Appends the trade and decrements both orders' remaining quantity as one
    /// unit. Fails with a conflict, leaving everything untouched, if either
    /// order is missing or has less than `fill.quantity` remaining.
    fn record_trade(&self, fill: &Fill) -> EngineResult<Trade>;

    /// Newest first, at most `limit`.
    fn recent_trades(&self, symbol: &str, limit: usize) -> EngineResult<Vec<Trade>>;

    /// Every trade of the symbol, oldest first.
    fn trade_history(&self, symbol: &str) -> EngineResult<Vec<Trade>>;
}
