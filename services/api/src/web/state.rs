//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use hafiz_core::{ports::RecitationMatcher, quota::QuotaTracker, resolver::PageResolver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matcher: Arc<dyn RecitationMatcher>,
    pub quota: Arc<QuotaTracker>,
    pub resolver: PageResolver,
    /// Cancelled on shutdown so in-flight matcher calls stop waiting.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the state with a fresh in-memory quota tracker sized from the config.
    pub fn new(config: Arc<Config>, matcher: Arc<dyn RecitationMatcher>) -> Self {
        let quota = Arc::new(QuotaTracker::new(config.daily_limit));
        Self::with_quota(config, matcher, quota)
    }

    pub fn with_quota(
        config: Arc<Config>,
        matcher: Arc<dyn RecitationMatcher>,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            config,
            matcher,
            quota,
            resolver: PageResolver::default(),
            shutdown: CancellationToken::new(),
        }
    }
}
