use std::future::Future;
use std::sync::Arc;

use kubeup_cloud::CloudAdapter;

/// Threads the `CloudAdapter` (and the means to drive its async calls from
/// synchronous Unit code) through the run, instead of a process-wide
/// singleton (spec §9 "Global mutable state... thread the stores through
/// the run context").
///
/// The reconciliation walk itself is a plain synchronous recursive descent
/// (spec §5): this handle lets a Unit's `find`/`render_live` call the
/// `async fn`s on [`CloudAdapter`] via `block_on` without spawning or
/// yielding control to any other Unit (SPEC_FULL §5).
#[derive(Clone)]
pub struct RunCtx {
    pub cloud: Arc<dyn CloudAdapter>,
    pub rt: tokio::runtime::Handle,
}

impl RunCtx {
    pub fn new(cloud: Arc<dyn CloudAdapter>, rt: tokio::runtime::Handle) -> Self {
        RunCtx { cloud, rt }
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.rt.block_on(fut)
    }
}
