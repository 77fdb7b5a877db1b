use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use reconcile_model::RouteInput;
use tracing::info;

use crate::engine::{effective_tolerance, reconcile_route, RouteOutcome};
use crate::progress::{NoOpProgressHandler, ProgressHandler};
use crate::{NoticeContainer, ReconcileNotice, ReconcileSettings};

/// Reconciles many routes, one task per route.
pub struct ReconcileRunner {
    settings: ReconcileSettings,
    progress: Arc<dyn ProgressHandler>,
}

impl Default for ReconcileRunner {
    fn default() -> Self {
        Self::new(ReconcileSettings::default())
    }
}

impl ReconcileRunner {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self {
            settings,
            progress: Arc::new(NoOpProgressHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Outcomes come back in input order.
    pub fn run(&self, routes: &[RouteInput]) -> Vec<RouteOutcome> {
        self.run_with(routes, reconcile_route)
    }

    /// Like [`ReconcileRunner::run`] with a custom per-route stage.
    pub fn run_with<F>(&self, routes: &[RouteInput], reconcile: F) -> Vec<RouteOutcome>
    where
        F: Fn(&RouteInput, &ReconcileSettings) -> RouteOutcome + Sync,
    {
        self.progress.set_total_routes(routes.len());

        #[cfg(feature = "parallel")]
        let outcomes: Vec<RouteOutcome> = {
            use rayon::prelude::*;
            routes
                .par_iter()
                .map(|route| self.run_route(route, &reconcile))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<RouteOutcome> = routes
            .iter()
            .map(|route| self.run_route(route, &reconcile))
            .collect();

        let notice_count: usize = outcomes.iter().map(|outcome| outcome.notices.len()).sum();
        info!(
            "Reconciled {} routes with {} notices",
            outcomes.len(),
            notice_count
        );
        outcomes
    }

    fn run_route<F>(&self, route: &RouteInput, reconcile: &F) -> RouteOutcome
    where
        F: Fn(&RouteInput, &ReconcileSettings) -> RouteOutcome,
    {
        self.progress.on_start_route(&route.line_ref);

        let result = catch_unwind(AssertUnwindSafe(|| reconcile(route, &self.settings)));
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let mut notices = NoticeContainer::new();
                notices.push(ReconcileNotice::runtime_exception(
                    &route.line_ref,
                    panic_payload_message(&*panic),
                ));
                RouteOutcome::failed(route, effective_tolerance(route, &self.settings), notices)
            }
        };

        self.progress.on_finish_route(&route.line_ref);
        outcome
    }
}

fn panic_payload_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
