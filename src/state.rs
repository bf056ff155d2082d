use crate::{
    config::EngineConfig,
    engine::MatchingEngine,
    instrument::{PairDirectory, StaticPairs},
    store::{Store, StoreResult},
};
use std::{path::Path, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
}

impl AppState {
    /// Opens the store at `path` and lists every supported pair as active.
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> StoreResult<Self> {
        Self::with_pairs(path, config, Arc::new(StaticPairs::default()))
    }

    pub fn with_pairs(
        path: impl AsRef<Path>,
        config: EngineConfig,
        pairs: Arc<dyn PairDirectory>,
    ) -> StoreResult<Self> {
        let store = Arc::new(Store::open(path)?);
        Ok(Self {
            engine: Arc::new(MatchingEngine::new(store, pairs, config)),
        })
    }
}
