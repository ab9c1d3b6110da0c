use std::sync::Arc;

use filesmith_core::{Config, JobLauncher, JobStore, SanitizedConfig};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn JobStore>,
    launcher: JobLauncher,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn JobStore>,
        launcher: JobLauncher,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            store,
            launcher,
            ws_broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    pub fn launcher(&self) -> &JobLauncher {
        &self.launcher
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
