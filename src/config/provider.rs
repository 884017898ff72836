use crate::config::schema::CatalogConfig;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How long a loaded catalog schema stays fresh.
pub const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

type Loader = Box<dyn Fn() -> Result<CatalogConfig> + Send + Sync>;

/// Caching schema provider for the schema-load boundary.
///
/// The builders themselves never assume caching — they are correct when
/// reconstructed on every call — so the cache lives here, with an explicit
/// TTL and an invalidation hook. Failed loads are not cached.
pub struct CachedConfigProvider {
    loader: Loader,
    ttl: Duration,
    cached: RwLock<Option<(Instant, Arc<CatalogConfig>)>>,
}

impl CachedConfigProvider {
    pub fn new(loader: impl Fn() -> Result<CatalogConfig> + Send + Sync + 'static) -> Self {
        CachedConfigProvider {
            loader: Box::new(loader),
            ttl: DEFAULT_CONFIG_TTL,
            cached: RwLock::new(None),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(move || CatalogConfig::from_file(&path))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current schema, reloading through the loader when the cached copy is
    /// absent or expired.
    pub fn get(&self) -> Result<Arc<CatalogConfig>> {
        if let Some((loaded_at, config)) = self.cached.read().expect("schema cache poisoned").as_ref()
        {
            if loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(config));
            }
        }
        let config = Arc::new((self.loader)()?);
        tracing::debug!(index = %config.name, "catalog schema loaded");
        *self.cached.write().expect("schema cache poisoned") =
            Some((Instant::now(), Arc::clone(&config)));
        Ok(config)
    }

    /// Drop the cached schema so the next [`get`](Self::get) reloads.
    pub fn invalidate(&self) {
        *self.cached.write().expect("schema cache poisoned") = None;
    }
}
