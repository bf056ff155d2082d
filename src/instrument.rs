use std::{
    fmt,
    str::FromStr,
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    BTC,
    ETH,
    SOL,
    USD,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Asset {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BTC" => Ok(Asset::BTC),
            "ETH" => Ok(Asset::ETH),
            "SOL" => Ok(Asset::SOL),
            "USD" => Ok(Asset::USD),
            _ => Err(format!("unsupported asset: `{}`", s)),
        }
    }
}

//A Trading pair: base/quote
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    /// The asset you buy or sell
    pub base: Asset,
    /// The asset you pay or receive
    pub quote: Asset,
}

impl Pair {
    /// Returns the usual string code, e.g "BTC-USD"
    pub fn code(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
    ///crypto-USD factory spot pairs
    pub fn crypto_usd(base: Asset) -> Self {
        Pair {
            base,
            quote: Asset::USD,
        }
    }
    pub fn supported() -> &'static [Pair] {
        &[BTC_USD, ETH_USD, SOL_USD]
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pair::supported()
            .iter()
            .find(|p| p.code() == s)
            .copied()
            .ok_or_else(|| format!("unsupported symbol: `{}`", s))
    }
}

impl TryFrom<String> for Pair {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pair> for String {
    fn from(p: Pair) -> String {
        p.code()
    }
}

pub const BTC_USD: Pair = Pair {
    base: Asset::BTC,
    quote: Asset::USD,
};
pub const ETH_USD: Pair = Pair {
    base: Asset::ETH,
    quote: Asset::USD,
};
pub const SOL_USD: Pair = Pair {
    base: Asset::SOL,
    quote: Asset::USD,
};

/// A listed pair and whether the matching engine should currently trade it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub symbol: String,
    pub base_asset: Asset,
    pub quote_asset: Asset,
    pub is_active: bool,
}

impl TradingPair {
    pub fn new(pair: Pair, is_active: bool) -> Self {
        Self {
            symbol: pair.code(),
            base_asset: pair.base,
            quote_asset: pair.quote,
            is_active,
        }
    }
}

/// Source of the trading pairs the engine accepts orders for and the
/// scheduler iterates on every tick.
pub trait PairDirectory: Send + Sync {
    fn pairs(&self) -> Vec<TradingPair>;

    fn active_symbols(&self) -> Vec<String> {
        self.pairs()
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| p.symbol)
            .collect()
    }

    fn lookup(&self, symbol: &str) -> Option<TradingPair> {
        self.pairs().into_iter().find(|p| p.symbol == symbol)
    }
}

/// In-process directory. Every supported pair starts active.
#[derive(Debug)]
pub struct StaticPairs {
    pairs: RwLock<Vec<TradingPair>>,
}

impl StaticPairs {
    pub fn new(pairs: Vec<TradingPair>) -> Self {
        Self {
            pairs: RwLock::new(pairs),
        }
    }

    /// Returns false if the symbol is not listed.
    pub fn set_active(&self, symbol: &str, active: bool) -> bool {
        let mut pairs = self.pairs.write().unwrap_or_else(PoisonError::into_inner);
        match pairs.iter_mut().find(|p| p.symbol == symbol) {
            Some(p) => {
                p.is_active = active;
                true
            }
            None => false,
        }
    }
}

impl Default for StaticPairs {
    fn default() -> Self {
        StaticPairs::new(
            Pair::supported()
                .iter()
                .map(|p| TradingPair::new(*p, true))
                .collect(),
        )
    }
}

impl PairDirectory for StaticPairs {
    fn pairs(&self) -> Vec<TradingPair> {
        self.pairs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
