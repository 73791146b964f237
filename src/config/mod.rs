pub mod provider;
pub mod scheduler;
pub mod server;
pub mod trust;

use provider::Provider;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config file: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("scheduler config: {0}")]
    Scheduler(#[from] scheduler::Error),
    #[error("server config: {0}")]
    Server(#[from] server::Error),
    #[error("trusted_computing config: {0}")]
    Trust(#[from] trust::Error),
}

/// Top-level configuration, assembled from the sections in spec.md §6.
#[derive(Debug, Clone)]
pub struct Config {
    pub scheduler: scheduler::Config,
    pub server: server::Config,
    pub trust: trust::Config,
}

impl Config {
    /// Loads `scheduler.toml` (if present) merged with environment
    /// overrides, the same layering `lnvps_api` uses (`config::Config`
    /// with a `.yaml`/`.toml` source plus env-var escape hatches per
    /// section).
    pub fn load() -> Result<Self, Error> {
        let inner = ::config::Config::builder()
            .add_source(::config::File::with_name("scheduler").required(false))
            .build()?;
        let provider = Provider::new(inner);
        Self::from_provider(&provider)
    }

    fn from_provider(provider: &Provider) -> Result<Self, Error> {
        Ok(Config {
            scheduler: scheduler::Config::try_from(provider)?,
            server: server::Config::try_from(provider)?,
            trust: trust::Config::try_from(provider)?,
        })
    }
}
