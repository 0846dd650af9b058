use std::sync::Arc;

use crate::config::AppConfig;
use crate::provider::DataProvider;
use crate::resources::Registry;

/// Shared per-process state handed to every handler through `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<Registry>,
    pub provider: Arc<dyn DataProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn DataProvider>) -> Self {
        Self { config: Arc::new(config), registry: Arc::new(Registry::builtin()), provider }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }
}
