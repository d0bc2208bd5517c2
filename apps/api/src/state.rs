use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::pipeline::ResumePipeline;
use crate::visitors::VisitorCounter;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup apart from the visitor counter's internal mutex.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: ResumePipeline,
    /// `None` when Auth0 settings are missing; privileged routes then reject every request.
    pub auth: Option<Arc<dyn TokenVerifier>>,
    pub visitors: Arc<VisitorCounter>,
}
