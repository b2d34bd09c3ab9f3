//! The compute-service seam between a shell and the pipeline.

use std::time::Duration;

use hl_core::CancelToken;
use tracing::debug;

use crate::envelope::ResultEnvelope;
use crate::pipeline::Pipeline;
use crate::progress::ProgressEvent;
use crate::request::Request;

/// Per-call execution options.
#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    /// Deadline for the whole request. Falls back to the pipeline's
    /// configured timeout.
    pub timeout: Option<Duration>,
    /// Caller-held token for cancelling from another thread.
    pub cancel: Option<CancelToken>,
}

impl ComputeOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Executes requests and always answers with an envelope.
pub trait ComputeService: Send + Sync {
    fn execute(&self, request: &Request, options: &ComputeOptions) -> ResultEnvelope;
}

/// Runs requests on the calling thread.
#[derive(Debug, Default)]
pub struct InProcessCompute {
    pipeline: Pipeline,
}

impl InProcessCompute {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// [`ComputeService::execute`] with stage events sent to `on_progress`.
    pub fn execute_with_progress(
        &self,
        request: &Request,
        options: &ComputeOptions,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> ResultEnvelope {
        let token = self.token(options);
        self.pipeline.dispatch_with_progress(request, &token, Some(on_progress))
    }

    /// The token a request runs under: the caller's token (or a fresh one)
    /// with the effective timeout folded in as a deadline.
    fn token(&self, options: &ComputeOptions) -> CancelToken {
        let base = options.cancel.clone().unwrap_or_default();
        match options.timeout.or_else(|| self.pipeline.config().compute_timeout()) {
            Some(timeout) => {
                debug!(timeout_s = timeout.as_secs_f64(), "request deadline set");
                base.with_timeout(timeout)
            }
            None => base,
        }
    }
}

impl ComputeService for InProcessCompute {
    fn execute(&self, request: &Request, options: &ComputeOptions) -> ResultEnvelope {
        let token = self.token(options);
        self.pipeline.dispatch(request, &token)
    }
}
