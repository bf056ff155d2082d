use clap::{Parser, Subcommand, builder::PossibleValuesParser};
use rust_decimal::Decimal;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    api::router,
    config::EngineConfig,
    orderbook::OrderBookSnapshot,
    orders::Side,
    state::AppState,
    utils::shutdown_token,
};

/// Spot exchange matching engine
#[derive(Parser)]
#[command(name = "trade_engine")]
#[command(version, about = "Price-time priority matching engine with order book, trades and candles")]
struct Cli {
    /// Directory of the order/trade database
    #[arg(long, global = true, default_value = "data/trade_engine")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run the matching scheduler
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Matching tick interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,
    },

    /// Place a limit order
    Place {
        /// Account the order belongs to
        #[arg(long, default_value = "cli")]
        account: String,

        /// Trading pair, e.g. BTC-USD
        symbol: String,

        ///BUY or SELL
        #[arg(value_parser = PossibleValuesParser::new(["buy", "sell"]))]
        side: String,

        /// Limit price (> 0)
        price: Decimal,

        /// Quantity (must be > 0)
        quantity: u64,
    },

    /// Display the order book of a symbol
    Book { symbol: String },

    /// Display the most recent trades of a symbol
    Trades { symbol: String },

    /// Display OHLCV candles of a symbol
    Candles {
        symbol: String,

        /// One of 1m, 5m, 15m, 1h, 4h, 1d
        #[arg(default_value = "1m")]
        interval: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run a single matching pass over every active symbol
    Tick,
}

fn print_order_book(book: &OrderBookSnapshot) {
    println!("------ Order Book {} ------", book.symbol);
    println!("Bids (highest first):");
    for level in &book.bids {
        println!("Price: {}, Total Qty: {}", level.price, level.quantity);
    }

    println!("Asks (lowest first):");
    for level in &book.asks {
        println!("Price: {}, Total Qty: {}", level.price, level.quantity);
    }
    println!("--------------------------");
}

async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let token = shutdown_token();
    let scheduler = state.engine.start(token.clone());

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    let shutdown = token.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    scheduler.stop().await;
    info!("bye");
    Ok(())
}

pub async fn run_cli() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let mut config = EngineConfig::default();
    if let Commands::Serve { tick_ms, .. } = &cli.command {
        config.tick_interval = Duration::from_millis((*tick_ms).max(1));
    }
    let state = AppState::open(&cli.db, config)?;
    let engine = Arc::clone(&state.engine);

    match cli.command {
        Commands::Serve { addr, .. } => serve(state, addr).await?,
        Commands::Place {
            account,
            symbol,
            side,
            price,
            quantity,
        } => {
            let side: Side = side.parse()?;
            let id = engine.place_order(&account, &symbol, side, price, quantity)?;
            println!("Order accepted: {}", id);
        }
        Commands::Book { symbol } => {
            print_order_book(&engine.get_order_book(&symbol)?);
        }
        Commands::Trades { symbol } => {
            let trades = engine.get_recent_trades(&symbol)?;
            if trades.is_empty() {
                println!("No trades occured");
            }
            for t in trades {
                println!(
                    "{} x {} (buy {} / sell {})",
                    t.price, t.quantity, t.buy_order_id, t.sell_order_id
                );
            }
        }
        Commands::Candles {
            symbol,
            interval,
            limit,
        } => {
            for c in engine.get_candles(&symbol, &interval, limit)? {
                println!(
                    "{} o={} h={} l={} c={} v={}",
                    c.time, c.open, c.high, c.low, c.close, c.volume
                );
            }
        }
        Commands::Tick => {
            let report = engine.run_tick();
            println!(
                "Scanned {} symbols, {} trades, {} failed",
                report.symbols, report.trades, report.failed
            );
        }
    }
    Ok(())
}
