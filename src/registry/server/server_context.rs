use crate::metrics_provider::METRICS_PROVIDER;
use crate::registry::{Error, Lifetime, Registry};
use tracing::{info, instrument, warn};

pub struct ServerContext {
    pub registry: Registry,
}

impl ServerContext {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    #[instrument(skip(self))]
    pub async fn lock(&self, resource: &str, lifetime: Lifetime) -> Result<u64, Error> {
        let result = self.registry.lock(resource, lifetime).await;
        match &result {
            Ok(version) => info!(version, "Locked {resource}"),
            Err(error) => warn!("Lock of {resource} refused: {error}"),
        }
        record_outcome("lock", &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn unlock(&self, resource: &str, version: u64) -> Result<(), Error> {
        let result = self.registry.unlock(resource, version).await;
        match &result {
            Ok(()) => info!(version, "Unlocked {resource}"),
            Err(error) => warn!("Unlock of {resource} refused: {error}"),
        }
        record_outcome("unlock", &result);
        result
    }

    pub async fn update_gauges(&self) {
        let entries = self.registry.entry_count().await;
        METRICS_PROVIDER
            .metric_registry_entries
            .set(i64::try_from(entries).unwrap_or(i64::MAX));
    }
}

fn record_outcome<T>(operation: &str, result: &Result<T, Error>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(Error::AlreadyLocked(_)) => "already_locked",
        Err(Error::AlreadyUnlocked(_)) => "already_unlocked",
        Err(Error::VersionMismatch { .. }) => "version_mismatch",
        Err(Error::VersionExhausted) => "version_exhausted",
    };
    METRICS_PROVIDER
        .metric_lock_requests
        .with_label_values(&[operation, outcome])
        .inc();
}
