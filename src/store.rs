use bincode::{
    config::standard,
    error::{DecodeError, EncodeError},
};
use parity_db::{ColId, Db, Options};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    errors::{ConflictError, EngineResult, ValidationError},
    matcher::Fill,
    orderbook::{BookLevel, OrderBook},
    orders::{NewOrder, Order, OrderId, OrderStatus, Side},
    repository::{OrderRepository, TradeLedger},
    trade::Trade,
    utils::{from_nanos, to_nanos},
};

const ORDERS: ColId = 0;
const TRADES: ColId = 1;

/// Errors from the key/value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ParityDB error: {0}")]
    Parity(#[from] parity_db::Error),

    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] EncodeError),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] DecodeError),
}

pub type StoreResult<T> = Result<T, StoreError>;

// On-disk layouts. Ids are stored as u128 and decimals in their 16-byte form.
#[derive(bincode::Encode, bincode::Decode)]
struct OrderRecord {
    id: u128,
    account_id: String,
    symbol: String,
    side: Side,
    price: [u8; 16],
    quantity: u64,
    remaining: u64,
    status: OrderStatus,
    created_at: SystemTime,
}

#[derive(bincode::Encode, bincode::Decode)]
struct TradeRecord {
    id: u128,
    symbol: String,
    buy_order_id: u128,
    sell_order_id: u128,
    price: [u8; 16],
    quantity: u64,
    timestamp: SystemTime,
}

impl From<&Order> for OrderRecord {
    fn from(o: &Order) -> Self {
        OrderRecord {
            id: o.id.as_u128(),
            account_id: o.account_id.clone(),
            symbol: o.symbol.clone(),
            side: o.side,
            price: o.price.serialize(),
            quantity: o.quantity,
            remaining: o.remaining,
            status: o.status,
            created_at: o.created_at,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Order {
            id: Uuid::from_u128(r.id),
            account_id: r.account_id,
            symbol: r.symbol,
            side: r.side,
            price: Decimal::deserialize(r.price),
            quantity: r.quantity,
            remaining: r.remaining,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

impl From<&Trade> for TradeRecord {
    fn from(t: &Trade) -> Self {
        TradeRecord {
            id: t.id.as_u128(),
            symbol: t.symbol.clone(),
            buy_order_id: t.buy_order_id.as_u128(),
            sell_order_id: t.sell_order_id.as_u128(),
            price: t.price.serialize(),
            quantity: t.quantity,
            timestamp: t.timestamp,
        }
    }
}

impl From<TradeRecord> for Trade {
    fn from(r: TradeRecord) -> Self {
        Trade {
            id: Uuid::from_u128(r.id),
            symbol: r.symbol,
            buy_order_id: Uuid::from_u128(r.buy_order_id),
            sell_order_id: Uuid::from_u128(r.sell_order_id),
            price: Decimal::deserialize(r.price),
            quantity: r.quantity,
            timestamp: r.timestamp,
        }
    }
}

/// Everything guarded by the write lock: the pending-order index per symbol
/// and the trade clock.
#[derive(Default)]
struct BookState {
    books: HashMap<String, OrderBook>,
    last_trade_nanos: u128,
}

impl BookState {
    /// Trade timestamps strictly increase so ledger keys never collide and
    /// keep execution order.
    fn next_trade_time(&mut self) -> SystemTime {
        let now = to_nanos(SystemTime::now());
        let ts = now.max(self.last_trade_nanos + 1);
        self.last_trade_nanos = ts;
        from_nanos(ts)
    }
}

/// A ParityDB-backed order repository and trade ledger.
///
/// - column 0 holds orders keyed by their 16-byte id
/// - column 1 holds trades keyed by "symbol:timestamp:trade_id"
///
/// Every mutation happens while holding the write lock, and each one is a
/// single `Db::commit` batch, so a trade and its two order decrements land
/// together or not at all.
pub struct Store {
    db: Db,
    state: Mutex<BookState>,
}

impl Store {
    /// Open (or create) a ParityDB at `path`, with B-tree indexed order and trade
    /// columns, and rebuild the pending-order index from disk.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut opts = Options::with_columns(path.as_ref(), 2);
        // enable B-tree index on both columns for ordered scans
        opts.columns[ORDERS as usize].btree_index = true;
        opts.columns[TRADES as usize].btree_index = true;
        let db = Db::open_or_create(&opts)?;
        let state = Self::recover(&db)?;
        Ok(Store {
            db,
            state: Mutex::new(state),
        })
    }

    fn recover(db: &Db) -> StoreResult<BookState> {
        let mut state = BookState::default();

        let mut pending = 0usize;
        let mut it = db.iter(ORDERS)?;
        it.seek_to_first()?;
        while let Some((_key, raw)) = it.next()? {
            let order = decode_order(&raw)?;
            if order.is_pending() {
                pending += 1;
                state
                    .books
                    .entry(order.symbol.clone())
                    .or_default()
                    .add_order(order);
            }
        }

        // Only the newest key of each symbol matters for the clock: read it,
        // then jump below that symbol's prefix to the previous symbol.
        let mut it = db.iter(TRADES)?;
        it.seek_to_last()?;
        while let Some((key, _)) = it.prev()? {
            let Some((symbol, ts_nanos)) = split_trade_key(&key) else {
                break;
            };
            state.last_trade_nanos = state.last_trade_nanos.max(ts_nanos);
            let mut below = symbol.to_vec();
            below.push(b':');
            it.seek(&below)?;
        }

        info!(pending, symbols = state.books.len(), "order index rebuilt");
        Ok(state)
    }

    fn lock(&self) -> MutexGuard<'_, BookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn order_key(id: OrderId) -> [u8; 16] {
        id.as_u128().to_be_bytes()
    }

    #[inline]
    fn prefix(symbol: &str) -> Vec<u8> {
        let mut k = Vec::with_capacity(symbol.len() + 1);
        k.extend_from_slice(symbol.as_bytes());
        k.push(b':');
        k
    }

    /// Smallest key sorting after every trade of `symbol`.
    #[inline]
    fn prefix_end(symbol: &str) -> Vec<u8> {
        let mut k = Vec::with_capacity(symbol.len() + 1);
        k.extend_from_slice(symbol.as_bytes());
        k.push(b':' + 1);
        k
    }

    #[inline]
    fn trade_key(trade: &Trade) -> Vec<u8> {
        let mut key = Self::prefix(&trade.symbol);
        key.extend_from_slice(&to_nanos(trade.timestamp).to_be_bytes());
        key.extend_from_slice(&trade.id.as_u128().to_be_bytes());
        key
    }

    fn order_entry(order: &Order) -> StoreResult<(ColId, Vec<u8>, Option<Vec<u8>>)> {
        let value = bincode::encode_to_vec(OrderRecord::from(order), standard())?;
        Ok((ORDERS, Self::order_key(order.id).to_vec(), Some(value)))
    }

    fn trade_entry(trade: &Trade) -> StoreResult<(ColId, Vec<u8>, Option<Vec<u8>>)> {
        let value = bincode::encode_to_vec(TradeRecord::from(trade), standard())?;
        Ok((TRADES, Self::trade_key(trade), Some(value)))
    }

    fn load_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        match self.db.get(ORDERS, &Self::order_key(id))? {
            Some(raw) => Ok(Some(decode_order(&raw)?)),
            None => Ok(None),
        }
    }

    /// Walks the symbol's trades oldest first.
    fn scan_trades(&self, symbol: &str, mut visit: impl FnMut(Trade)) -> StoreResult<()> {
        let prefix = Self::prefix(symbol);
        let mut it = self.db.iter(TRADES)?;
        it.seek(&prefix)?;
        while let Some((k, v)) = it.next()? {
            if !k.starts_with(&prefix) {
                break;
            }
            visit(decode_trade(&v)?);
        }
        Ok(())
    }

    /// Walks the symbol's trades newest first while `visit` returns true.
    fn scan_trades_rev(
        &self,
        symbol: &str,
        mut visit: impl FnMut(Trade) -> bool,
    ) -> StoreResult<()> {
        let prefix = Self::prefix(symbol);
        let mut it = self.db.iter(TRADES)?;
        it.seek(&Self::prefix_end(symbol))?;
        while let Some((k, v)) = it.prev()? {
            if !k.starts_with(&prefix) || !visit(decode_trade(&v)?) {
                break;
            }
        }
        Ok(())
    }

    /// Pending orders currently indexed for `symbol`.
    pub fn pending_count(&self, symbol: &str) -> usize {
        self.lock().books.get(symbol).map_or(0, |b| b.len())
    }
}

fn decode_order(raw: &[u8]) -> StoreResult<Order> {
    let (record, _): (OrderRecord, usize) = bincode::decode_from_slice(raw, standard())?;
    Ok(record.into())
}

/// Splits a trade key into its symbol and timestamp without decoding the value.
fn split_trade_key(key: &[u8]) -> Option<(&[u8], u128)> {
    let sep = key.len().checked_sub(33)?;
    if key[sep] != b':' {
        return None;
    }
    let ts: [u8; 16] = key[sep + 1..sep + 17].try_into().ok()?;
    Some((&key[..sep], u128::from_be_bytes(ts)))
}

fn decode_trade(raw: &[u8]) -> StoreResult<Trade> {
    let (record, _): (TradeRecord, usize) = bincode::decode_from_slice(raw, standard())?;
    Ok(record.into())
}

impl OrderRepository for Store {
    fn create_order(&self, new: NewOrder) -> EngineResult<Order> {
        new.validate()?;

        let mut state = self.lock();
        let order = new.into_order(Uuid::new_v4(), SystemTime::now());
        self.db
            .commit(vec![Self::order_entry(&order)?])
            .map_err(StoreError::from)?;

        state
            .books
            .entry(order.symbol.clone())
            .or_default()
            .add_order(order.clone());
        debug!(order_id = %order.id, symbol = %order.symbol, "order persisted");
        Ok(order)
    }

    fn get_order(&self, id: OrderId) -> EngineResult<Option<Order>> {
        Ok(self.load_order(id)?)
    }

    fn best_buy(&self, symbol: &str) -> EngineResult<Option<Order>> {
        Ok(self
            .lock()
            .books
            .get(symbol)
            .and_then(|b| b.best_bid())
            .cloned())
    }

    fn best_sell(&self, symbol: &str) -> EngineResult<Option<Order>> {
        Ok(self
            .lock()
            .books
            .get(symbol)
            .and_then(|b| b.best_ask())
            .cloned())
    }

    fn depth_levels(&self, symbol: &str, side: Side, limit: usize) -> EngineResult<Vec<BookLevel>> {
        Ok(self
            .lock()
            .books
            .get(symbol)
            .map(|b| b.depth(side, limit))
            .unwrap_or_default())
    }
}

impl TradeLedger for Store {
    fn record_trade(&self, fill: &Fill) -> EngineResult<Trade> {
        if fill.quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let mut state = self.lock();

        // Re-read both orders under the lock: the fill may have been decided on
        // a view that another commit has since consumed.
        let mut buy = self
            .load_order(fill.buy_order_id)?
            .ok_or(ConflictError::UnknownOrder(fill.buy_order_id))?;
        let mut sell = self
            .load_order(fill.sell_order_id)?
            .ok_or(ConflictError::UnknownOrder(fill.sell_order_id))?;

        if buy.side != Side::Buy {
            return Err(ConflictError::WrongSide(buy.id).into());
        }
        if sell.side != Side::Sell {
            return Err(ConflictError::WrongSide(sell.id).into());
        }
        if buy.symbol != sell.symbol {
            return Err(ConflictError::SymbolMismatch {
                buy: buy.id,
                sell: sell.id,
            }
            .into());
        }

        buy.fill(fill.quantity)?;
        sell.fill(fill.quantity)?;

        let trade = Trade {
            id: Uuid::new_v4(),
            symbol: buy.symbol.clone(),
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            price: fill.price,
            quantity: fill.quantity,
            timestamp: state.next_trade_time(),
        };

        let batch = vec![
            Self::trade_entry(&trade)?,
            Self::order_entry(&buy)?,
            Self::order_entry(&sell)?,
        ];
        self.db.commit(batch).map_err(StoreError::from)?;

        if let Some(book) = state.books.get_mut(&trade.symbol) {
            book.apply_fill(Side::Buy, buy.price, buy.id, fill.quantity);
            book.apply_fill(Side::Sell, sell.price, sell.id, fill.quantity);
        }
        Ok(trade)
    }

    fn recent_trades(&self, symbol: &str, limit: usize) -> EngineResult<Vec<Trade>> {
        let mut trades = Vec::with_capacity(limit.min(256));
        if limit > 0 {
            self.scan_trades_rev(symbol, |t| {
                trades.push(t);
                trades.len() < limit
            })?;
        }
        Ok(trades)
    }

    fn trade_history(&self, symbol: &str) -> EngineResult<Vec<Trade>> {
        let mut trades = Vec::new();
        self.scan_trades(symbol, |t| trades.push(t))?;
        Ok(trades)
    }
}
