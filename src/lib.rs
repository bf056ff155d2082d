pub mod api;
pub mod candles;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod instrument;
pub mod matcher;
pub mod orderbook;
pub mod orders;
pub mod repository;
pub mod state;
pub mod store;
pub mod trade;
pub mod utils;
