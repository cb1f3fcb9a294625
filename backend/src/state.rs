use std::sync::Arc;

use crate::{
    config::Config,
    repositories::store::SignatureStore,
    services::{AttendanceReportService, SignatureNotifier, SignatureService, SignatureSettings},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SignatureStore>,
    pub signatures: SignatureService,
    pub reports: AttendanceReportService,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SignatureStore>,
        notifier: Arc<dyn SignatureNotifier>,
        config: Config,
    ) -> Self {
        let signatures = SignatureService::new(
            store.clone(),
            notifier,
            SignatureSettings::from_config(&config),
        );
        let reports = AttendanceReportService::new(store.clone(), config.time_zone);
        Self {
            store,
            signatures,
            reports,
            config,
        }
    }
}
