use std::sync::Arc;

use crate::orchestrator::ResolutionOrchestrator;
use crate::scheduler::RefreshScheduler;

pub struct AppState {
    pub orchestrator: Arc<ResolutionOrchestrator>,
    /// Present when the server runs with background refresh.
    pub scheduler: Option<Arc<RefreshScheduler>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ResolutionOrchestrator>) -> Self {
        Self {
            orchestrator,
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<RefreshScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}
