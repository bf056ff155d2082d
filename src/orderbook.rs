use crate::orders::{Order, OrderId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Aggregated pending quantity at one price.
///
/// Summed as `u128`: a level may hold many orders of up to `u64::MAX` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: u128,
}

/// Depth-of-book view for one symbol, both sides best-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Highest price first.
    pub bids: Vec<BookLevel>,
    /// Lowest price first.
    pub asks: Vec<BookLevel>,
}

/// An [`OrderBook`] indexes the **pending** buy and sell orders of one symbol in
/// two separate [`BTreeMap`]s:
/// - `bids` (buy orders)
/// - `asks` (sell orders)
///
/// Each price level (key) has a queue of orders stored in a [`VecDeque`], kept
/// sorted by creation time to maintain **price-time** priority. Orders with
/// nothing left to fill are removed, so the front of the best level is always
/// the next order the matcher should consider.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Buy orders, keyed by price in ascending order.
    ///
    /// The best bid is the **last** key.
    pub bids: BTreeMap<Decimal, VecDeque<Order>>,

    /// Sell orders, keyed by price in ascending order.
    ///
    /// The best ask is the **first** key.
    pub asks: BTreeMap<Decimal, VecDeque<Order>>,
}

impl OrderBook {
    /// Creates a new, empty [`OrderBook`], with no pending bids or asks.
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, VecDeque<Order>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Adds a pending order to its price level.
    ///
    /// Orders are placed after every order at the same price created at or
    /// before them, so equal timestamps keep arrival order.
    pub fn add_order(&mut self, order: Order) {
        if !order.is_pending() {
            warn!(order_id = %order.id, "refusing to index an order with nothing remaining");
            return;
        }
        let queue = self.side_mut(order.side).entry(order.price).or_default();
        let pos = queue.partition_point(|o| o.created_at <= order.created_at);
        queue.insert(pos, order);
    }

    /// Highest-priced buy order; earliest created among equals.
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.values().next_back().and_then(|q| q.front())
    }

    /// Lowest-priced sell order; earliest created among equals.
    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.values().next().and_then(|q| q.front())
    }

    /// Mirrors a committed fill: subtracts `qty` from the indexed order and drops it
    /// (and its level, if emptied) once nothing remains.
    ///
    /// Returns the order's new remaining quantity, or `None` if it is not indexed.
    pub fn apply_fill(
        &mut self,
        side: Side,
        price: Decimal,
        order_id: OrderId,
        qty: u64,
    ) -> Option<u64> {
        let book_side = self.side_mut(side);
        let queue = book_side.get_mut(&price)?;
        let pos = queue.iter().position(|o| o.id == order_id)?;

        let remaining = {
            let order = &mut queue[pos];
            // The store validated the fill against the persisted record first.
            if order.fill(qty).is_err() {
                warn!(%order_id, qty, "index out of sync with store, dropping order");
                order.remaining = 0;
            }
            order.remaining
        };

        if remaining == 0 {
            queue.remove(pos);
        }
        if queue.is_empty() {
            book_side.remove(&price);
        }
        Some(remaining)
    }

    /// Groups pending orders by price and sums their remaining quantity.
    ///
    /// Buy levels come highest price first, sell levels lowest price first,
    /// truncated to `limit` levels.
    pub fn depth(&self, side: Side, limit: usize) -> Vec<BookLevel> {
        let level = |(price, orders): (&Decimal, &VecDeque<Order>)| BookLevel {
            price: *price,
            quantity: orders.iter().map(|o| u128::from(o.remaining)).sum(),
        };
        match side {
            Side::Buy => self.bids.iter().rev().take(limit).map(level).collect(),
            Side::Sell => self.asks.iter().take(limit).map(level).collect(),
        }
    }

    /// Number of pending orders on both sides.
    pub fn len(&self) -> usize {
        self.bids
            .values()
            .chain(self.asks.values())
            .map(|q| q.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
