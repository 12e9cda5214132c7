use contact_allocator::workflows::allocation::AllocationSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    /// Applied when a request does not carry its own limit.
    pub(crate) defaults: AllocationSettings,
}

#[cfg(test)]
impl AppState {
    pub(crate) fn for_tests(ready: bool) -> Self {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        Self {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
            defaults: AllocationSettings::default(),
        }
    }
}
