use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::StatusMonitor;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub monitor: Arc<StatusMonitor>,
}

impl AppContext {
    pub fn new(config: AppConfig, monitor: StatusMonitor) -> Self {
        Self {
            config: Arc::new(config),
            monitor: Arc::new(monitor),
        }
    }
}
