/// Trait for handling progress events while reconciling routes
pub trait ProgressHandler: Send + Sync {
    /// Set total number of routes to reconcile
    fn set_total_routes(&self, count: usize);

    /// Called when a worker picks up a route
    fn on_start_route(&self, line_ref: &str);

    /// Called when a route is done, whether it succeeded or panicked
    fn on_finish_route(&self, line_ref: &str);
}

/// A no-op progress handler
pub struct NoOpProgressHandler;

impl ProgressHandler for NoOpProgressHandler {
    fn set_total_routes(&self, _count: usize) {}
    fn on_start_route(&self, _line_ref: &str) {}
    fn on_finish_route(&self, _line_ref: &str) {}
}
