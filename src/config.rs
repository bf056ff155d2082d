use std::time::Duration;

/// Knobs for the matching engine and its read views.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the scheduler scans every active symbol.
    pub tick_interval: Duration,
    /// Price levels per side returned by order book queries.
    pub depth_limit: usize,
    /// Trades returned by recent-trade queries.
    pub recent_trades_limit: usize,
    /// Candles returned when the caller does not ask for a limit.
    pub candle_default_limit: usize,
    /// Larger candle limits are clamped to this.
    pub candle_max_limit: usize,
    /// Run a matching pass as soon as an order is placed instead of waiting
    /// for the next tick.
    pub wake_on_order: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            depth_limit: 20,
            recent_trades_limit: 50,
            candle_default_limit: 100,
            candle_max_limit: 1000,
            wake_on_order: true,
        }
    }
}
