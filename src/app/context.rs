use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::daemon::{AggregationParams, Aggregator};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub aggregator: Aggregator<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(Config::default(), store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_config(&config.fetcher)?);
        let aggregator = Aggregator::new(
            store.clone(),
            fetcher,
            Normalizer::new(),
            AggregationParams::from(&config.aggregator),
        );

        Ok(Self {
            config,
            store,
            aggregator,
        })
    }

    /// The user whose follows drive the command layer.
    pub fn user_id(&self) -> i64 {
        self.config.user_id
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GatorError::Config("Could not find data directory".into()))?;
        let gator_dir = data_dir.join("gator");
        std::fs::create_dir_all(&gator_dir)?;
        Ok(gator_dir.join("gator.db"))
    }
}
