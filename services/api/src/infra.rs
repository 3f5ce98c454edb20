use ccne_report::config::WizardConfig;
use ccne_report::report::{LocalReportGenerator, RemoteReportGenerator, TempReportStore};
use ccne_report::wizard::{
    DirectorySnapshotStore, FormSession, MemorySnapshotStore, SnapshotStore, WizardService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Wizard = WizardService<RemoteReportGenerator>;

/// Everything the router needs: the session owner and the generator whose
/// store backs the download route.
pub(crate) struct WizardStack {
    pub(crate) service: Arc<Wizard>,
    pub(crate) generator: Arc<RemoteReportGenerator>,
}

pub(crate) fn snapshot_store(config: &WizardConfig) -> Arc<dyn SnapshotStore> {
    match &config.snapshot_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "persisting form snapshots to disk");
            Arc::new(DirectorySnapshotStore::new(dir.clone()))
        }
        None => Arc::new(MemorySnapshotStore::new()),
    }
}

pub(crate) fn build_wizard(config: &WizardConfig) -> WizardStack {
    let reports = Arc::new(TempReportStore::new(config.report_ttl));
    let fallback = LocalReportGenerator::new(reports);
    let generator = Arc::new(RemoteReportGenerator::new(config.remote.clone(), fallback));
    if generator.is_remote() {
        info!("reports generated by the remote endpoint");
    }
    let session = FormSession::new(Some(snapshot_store(config)), config.persist_debounce);
    let service = Arc::new(WizardService::new(session, Arc::clone(&generator)));
    WizardStack { service, generator }
}

#[cfg(test)]
pub(crate) fn test_config(snapshot_dir: Option<std::path::PathBuf>) -> WizardConfig {
    WizardConfig {
        snapshot_dir,
        persist_debounce: std::time::Duration::from_millis(300),
        report_ttl: std::time::Duration::from_secs(60),
        remote: None,
    }
}
