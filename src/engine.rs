use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    candles::{Candle, Interval, build_candles},
    config::EngineConfig,
    errors::{EngineError, EngineResult, ValidationError},
    instrument::{PairDirectory, TradingPair},
    matcher::{self, MatchOutcome},
    orderbook::OrderBookSnapshot,
    orders::{NewOrder, Order, OrderId, Side},
    repository::{OrderRepository, TradeLedger},
    store::Store,
    trade::Trade,
};

/// Outcome of one pass over every active symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub symbols: usize,
    pub trades: usize,
    pub failed: usize,
}

/// The exchange core: order placement, read views, and the matching scheduler.
///
/// All mutation goes through the repository's `create_order` and the ledger's
/// `record_trade`; the engine itself holds no order state.
pub struct MatchingEngine<S = Store> {
    store: Arc<S>,
    pairs: Arc<dyn PairDirectory>,
    config: EngineConfig,
    wake: Notify,
}

impl<S> MatchingEngine<S>
where
    S: OrderRepository + TradeLedger,
{
    pub fn new(store: Arc<S>, pairs: Arc<dyn PairDirectory>, config: EngineConfig) -> Self {
        Self {
            store,
            pairs,
            config,
            wake: Notify::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn list_pairs(&self) -> Vec<TradingPair> {
        self.pairs.pairs()
    }

    /// Accepts a limit order from an already-authenticated account.
    ///
    /// The symbol must be listed and active; price and quantity must be
    /// positive. Nothing is persisted on rejection.
    pub fn place_order(
        &self,
        account_id: &str,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: u64,
    ) -> EngineResult<OrderId> {
        let pair = self
            .pairs
            .lookup(symbol)
            .ok_or_else(|| ValidationError::UnsupportedSymbol(symbol.to_string()))?;
        if !pair.is_active {
            return Err(ValidationError::InactiveSymbol(symbol.to_string()).into());
        }

        let order = self.store.create_order(NewOrder {
            account_id: account_id.to_string(),
            symbol: pair.symbol,
            side,
            price,
            quantity,
        })?;
        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %side,
            price = %price,
            qty = quantity,
            "order accepted"
        );

        if self.config.wake_on_order {
            self.wake.notify_one();
        }
        Ok(order.id)
    }

    pub fn get_order(&self, id: OrderId) -> EngineResult<Order> {
        self.store
            .get_order(id)?
            .ok_or_else(|| EngineError::NotFound(format!("order {id}")))
    }

    /// Pending depth for both sides. Unknown symbols yield an empty book.
    pub fn get_order_book(&self, symbol: &str) -> EngineResult<OrderBookSnapshot> {
        let depth = self.config.depth_limit;
        Ok(OrderBookSnapshot {
            symbol: symbol.to_string(),
            bids: self.store.depth_levels(symbol, Side::Buy, depth)?,
            asks: self.store.depth_levels(symbol, Side::Sell, depth)?,
        })
    }

    pub fn get_recent_trades(&self, symbol: &str) -> EngineResult<Vec<Trade>> {
        self.store
            .recent_trades(symbol, self.config.recent_trades_limit)
    }

    /// Candles for `symbol`, newest first.
    ///
    /// `interval` must be one of the supported widths. A missing `limit` uses
    /// the configured default; larger limits are clamped to the configured max.
    pub fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Candle>> {
        let interval: Interval = interval.parse()?;
        let limit = match limit {
            None => self.config.candle_default_limit,
            Some(0) => return Err(ValidationError::ZeroLimit.into()),
            Some(n) => n.min(self.config.candle_max_limit),
        };
        let history = self.store.trade_history(symbol)?;
        Ok(build_candles(&history, interval, limit))
    }

    /// Matches `symbol` until its best bid and best ask no longer cross.
    ///
    /// Each iteration re-reads the best orders, asks the matcher for a decision
    /// and commits it. The first failed commit ends the cycle; trades committed
    /// before it stay committed.
    pub fn run_cycle(&self, symbol: &str) -> EngineResult<Vec<Trade>> {
        let mut trades = Vec::new();
        self.drain(symbol, &mut trades)?;
        Ok(trades)
    }

    fn drain(&self, symbol: &str, trades: &mut Vec<Trade>) -> EngineResult<()> {
        loop {
            let Some(buy) = self.store.best_buy(symbol)? else {
                return Ok(());
            };
            let Some(sell) = self.store.best_sell(symbol)? else {
                return Ok(());
            };

            let fill = match matcher::decide(Some(&buy), Some(&sell)) {
                MatchOutcome::NoMatch => return Ok(()),
                MatchOutcome::Match(fill) => fill,
            };
            info!(symbol, price = %fill.price, qty = fill.quantity, "match found");

            let trade = self.store.record_trade(&fill)?;
            debug!(
                symbol,
                trade_id = %trade.id,
                buy_order_id = %trade.buy_order_id,
                sell_order_id = %trade.sell_order_id,
                "trade committed"
            );
            trades.push(trade);
        }
    }

    /// Runs one matching cycle for every active symbol, in directory order.
    ///
    /// Failures are contained per symbol: a conflict is retried on the next
    /// tick and a persistence error is logged, and the tick moves on.
    pub fn run_tick(&self) -> TickReport {
        self.tick(None)
    }

    fn tick(&self, cancel: Option<&CancellationToken>) -> TickReport {
        let mut report = TickReport::default();
        for symbol in self.pairs.active_symbols() {
            if cancel.is_some_and(|t| t.is_cancelled()) {
                break;
            }
            report.symbols += 1;

            let mut trades = Vec::new();
            let result = self.drain(&symbol, &mut trades);
            report.trades += trades.len();
            match result {
                Ok(()) => {}
                Err(EngineError::Conflict(e)) => {
                    report.failed += 1;
                    warn!(%symbol, error = %e, "match conflict, retrying next tick");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(%symbol, error = %e, "matching cycle failed");
                }
            }
        }
        report
    }
}

impl<S> MatchingEngine<S>
where
    S: OrderRepository + TradeLedger + 'static,
{
    /// Spawns the background scheduler. It ticks every `tick_interval` (and
    /// early when an order is placed, if `wake_on_order` is set) until `token`
    /// is cancelled.
    pub fn start(self: &Arc<Self>, token: CancellationToken) -> SchedulerHandle {
        let engine = Arc::clone(self);
        let join = tokio::spawn(engine.run_scheduler(token.clone()));
        SchedulerHandle { token, join }
    }

    async fn run_scheduler(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick = ?self.config.tick_interval, "matching scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
            }

            // Store calls block; run the tick off the async workers. A blocking
            // task is never aborted, so a commit in flight always completes.
            let engine = Arc::clone(&self);
            let cancel = token.clone();
            match tokio::task::spawn_blocking(move || engine.tick(Some(&cancel))).await {
                Ok(report) if report.trades > 0 || report.failed > 0 => {
                    info!(
                        trades = report.trades,
                        failed = report.failed,
                        symbols = report.symbols,
                        "matching tick"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "matching tick aborted"),
            }
        }
        info!("matching scheduler stopped");
    }
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals shutdown and waits for the current tick to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "matching scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
