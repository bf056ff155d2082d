use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Malformed or out-of-range input. Always reported to the caller, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("price must be > 0")]
    NonPositivePrice,
    #[error("quantity must be > 0")]
    ZeroQuantity,
    #[error("side must be BUY or SELL, got `{0}`")]
    UnknownSide(String),
    #[error("invalid interval: `{0}`")]
    UnsupportedInterval(String),
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("unsupported symbol: `{0}`")]
    UnsupportedSymbol(String),
    #[error("trading is not active for `{0}`")]
    InactiveSymbol(String),
    #[error("limit must be > 0")]
    ZeroLimit,
}

/// A trade commit whose preconditions no longer hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("order {0} does not exist")]
    UnknownOrder(Uuid),
    #[error("order {order_id} has {remaining} remaining, cannot fill {requested}")]
    Overfill {
        order_id: Uuid,
        remaining: u64,
        requested: u64,
    },
    #[error("order {0} is on the wrong side for this trade")]
    WrongSide(Uuid),
    #[error("orders {buy} and {sell} belong to different symbols")]
    SymbolMismatch { buy: Uuid, sell: Uuid },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
