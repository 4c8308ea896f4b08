use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::middleware::{build_rate_limiter, IpRateLimiter};
use crate::services::{ExmrService, HeService, UserService};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let rate_limiter = build_rate_limiter(&config.api);
        Self {
            config: Arc::new(config),
            store,
            rate_limiter,
        }
    }

    pub fn he_service(&self) -> HeService {
        HeService::new(self.store.clone())
    }

    pub fn exmr_service(&self) -> ExmrService {
        ExmrService::new(self.store.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.store.clone(), &self.config.security)
    }
}
