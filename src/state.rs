// src/state.rs
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::ReservationService;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub reservations: ReservationService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let reservations = ReservationService::new(
            store.clone(),
            config.max_active_reservations,
            config.prune_schedule_on_delete,
        );
        Self {
            store,
            reservations,
            config: Arc::new(config),
        }
    }
}
