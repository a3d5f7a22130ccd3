//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::PayloadCache;
use crate::report::{DEFAULT_MESSAGE_LIMIT, ReportPipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ReportPipeline,

    /// Counted by `/status`, emptied by `/refresh`.
    pub cache: Arc<PayloadCache>,

    pub message_limit: usize,
}

impl AppState {
    pub fn new(pipeline: ReportPipeline, cache: Arc<PayloadCache>) -> Self {
        Self {
            pipeline,
            cache,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }

    pub fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = limit;
        self
    }
}
