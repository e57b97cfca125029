//! services/api/src/web/analyze_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single recitation analysis: quota admission, the matcher call,
//! parsing its reply, and page resolution for every candidate.

use crate::web::{
    candidates::parse_candidates,
    middleware::Caller,
    state::AppState,
};
use hafiz_core::{
    domain::{AudioClip, CandidateMatch, QuotaInfo, ResolvedMatch},
    ports::PortError,
    resolver::PageResolver,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why an admitted request ended without results. Each maps to a stable marker
/// that clients can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisFailure {
    MatcherUnavailable,
    MatcherTimedOut,
    MalformedOutput,
    UnsupportedAudio,
    ShuttingDown,
}

impl AnalysisFailure {
    pub fn marker(self) -> &'static str {
        match self {
            Self::MatcherUnavailable => "matcher_unavailable",
            Self::MatcherTimedOut => "matcher_timeout",
            Self::MalformedOutput => "matcher_output_malformed",
            Self::UnsupportedAudio => "unsupported_audio_format",
            Self::ShuttingDown => "server_shutting_down",
        }
    }
}

/// The outcome of an admitted analysis request.
#[derive(Debug)]
pub struct AnalysisReport {
    pub results: Vec<ResolvedMatch>,
    pub quota: QuotaInfo,
    pub failure: Option<AnalysisFailure>,
}

impl AnalysisReport {
    fn empty(quota: QuotaInfo) -> Self {
        Self {
            results: Vec::new(),
            quota,
            failure: None,
        }
    }

    fn failed(quota: QuotaInfo, failure: AnalysisFailure) -> Self {
        Self {
            results: Vec::new(),
            quota,
            failure: Some(failure),
        }
    }
}

/// The only way a request is refused outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeRejection {
    QuotaExhausted(QuotaInfo),
}

/// Charges one attempt to the caller. Runs before the upload is read, so an
/// exhausted caller never has its body buffered.
pub fn admit_caller(app_state: &AppState, caller: &Caller) -> Result<QuotaInfo, AnalyzeRejection> {
    let decision = app_state
        .quota
        .check_and_consume(&caller.identity, caller.premium);
    if !decision.allowed {
        warn!("Quota exhausted for caller '{}'", caller.identity);
        return Err(AnalyzeRejection::QuotaExhausted(decision.info));
    }
    Ok(decision.info)
}

/// The main asynchronous task for analysing one uploaded recitation of an
/// admitted caller.
///
/// `upload` is `None` when the request carried no readable audio part.
pub async fn analyze_process(
    app_state: Arc<AppState>,
    quota: QuotaInfo,
    upload: Option<AudioClip>,
) -> AnalysisReport {
    let min_bytes = app_state.config.min_audio_bytes;
    let audio = match upload {
        Some(audio) if audio.len() >= min_bytes => audio,
        other => {
            let size = other.as_ref().map(AudioClip::len).unwrap_or(0);
            info!(
                "Upload of {} bytes is below {} bytes; treating as no recitation.",
                size, min_bytes
            );
            return AnalysisReport::empty(quota);
        }
    };

    let raw_reply = match call_matcher(&app_state, &audio).await {
        Ok(reply) => reply,
        Err(failure) => return AnalysisReport::failed(quota, failure),
    };

    let candidates = match parse_candidates(&raw_reply) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Discarding matcher reply: {}", e);
            return AnalysisReport::failed(quota, AnalysisFailure::MalformedOutput);
        }
    };

    let results = resolve_candidates(&app_state.resolver, candidates);
    info!("Resolved {} match(es).", results.len());

    AnalysisReport {
        results,
        quota,
        failure: None,
    }
}

/// Calls the matcher, bounded by the configured timeout and by server shutdown.
async fn call_matcher(app_state: &AppState, audio: &AudioClip) -> Result<String, AnalysisFailure> {
    let matcher_start = Instant::now();
    let call = tokio::time::timeout(
        app_state.config.matcher_timeout,
        app_state.matcher.match_recitation(audio),
    );

    let outcome = tokio::select! {
        _ = app_state.shutdown.cancelled() => {
            warn!("Matcher call abandoned because the server is shutting down.");
            return Err(AnalysisFailure::ShuttingDown);
        }
        outcome = call => outcome,
    };
    info!("⏱️ Matcher took: {:?}", matcher_start.elapsed());

    match outcome {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(PortError::UnsupportedMedia(mime))) => {
            warn!("Matcher cannot accept audio of type '{}'", mime);
            Err(AnalysisFailure::UnsupportedAudio)
        }
        Ok(Err(e)) => {
            error!("Matcher call failed: {}", e);
            Err(AnalysisFailure::MatcherUnavailable)
        }
        Err(_) => {
            error!(
                "Matcher call timed out after {:?}",
                app_state.config.matcher_timeout
            );
            Err(AnalysisFailure::MatcherTimedOut)
        }
    }
}

/// Resolves every candidate to a page; candidates that cannot be placed are dropped.
fn resolve_candidates(resolver: &PageResolver, candidates: Vec<CandidateMatch>) -> Vec<ResolvedMatch> {
    candidates
        .into_iter()
        .filter_map(|candidate| match resolver.resolve_match(candidate) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                debug!("Dropping candidate: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use hafiz_core::{domain::CallerIdentity, ports::{PortResult, RecitationMatcher}};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubMatcher {
        reply: PortResult<String>,
        calls: AtomicUsize,
    }

    impl StubMatcher {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: PortError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RecitationMatcher for StubMatcher {
        async fn match_recitation(&self, _audio: &AudioClip) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(PortError::UnsupportedMedia(m)) => Err(PortError::UnsupportedMedia(m.clone())),
                Err(e) => Err(PortError::Unavailable(e.to_string())),
            }
        }
    }

    struct StalledMatcher;

    #[async_trait]
    impl RecitationMatcher for StalledMatcher {
        async fn match_recitation(&self, _audio: &AudioClip) -> PortResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("[]".to_string())
        }
    }

    fn state_with(matcher: Arc<dyn RecitationMatcher>, config: Config) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(config), matcher))
    }

    fn caller(id: &str) -> Caller {
        Caller {
            identity: CallerIdentity::new(id),
            premium: false,
        }
    }

    fn recording() -> Option<AudioClip> {
        Some(AudioClip::new(vec![7u8; 4096], "audio/wav"))
    }

    async fn run(state: &Arc<AppState>, id: &str, upload: Option<AudioClip>) -> AnalysisReport {
        let quota = admit_caller(state, &caller(id)).unwrap();
        analyze_process(state.clone(), quota, upload).await
    }

    #[tokio::test]
    async fn mutashabih_candidates_are_all_returned() {
        // "فَبِأَيِّ آلَاءِ رَبِّكُمَا تُكَذِّبَانِ" recurs throughout Rahman.
        let reply = r#"```json
        [
          {"surah_no": 55, "verse_no": 13, "surah_name": "Rahman", "arabic": "فَبِأَيِّ آلَاءِ رَبِّكُمَا تُكَذِّبَانِ", "translation": "..."},
          {"surah_no": 55, "verse_no": 16, "surah_name": "Rahman", "arabic": "فَبِأَيِّ آلَاءِ رَبِّكُمَا تُكَذِّبَانِ", "translation": "..."},
          {"surah_no": 55, "verse_no": 18, "surah_name": "Rahman", "arabic": "فَبِأَيِّ آلَاءِ رَبِّكُمَا تُكَذِّبَانِ", "translation": "..."}
        ]
        ```"#;
        let state = state_with(StubMatcher::replying(reply), Config::default());

        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.results.len(), 3);
        assert!(report.failure.is_none());
        let verses: Vec<u16> = report.results.iter().map(|r| r.candidate.verse_no).collect();
        assert_eq!(verses, vec![13, 16, 18]);
        assert!(report.results.iter().all(|r| r.location.page >= 531));
        assert_eq!(report.quota.remaining, Some(2));
    }

    #[tokio::test]
    async fn invalid_and_unknown_candidates_are_dropped() {
        let reply = r#"[
            {"surah_no": 0, "verse_no": 1},
            {"surah_no": null, "verse_no": 1},
            {"surah_no": 130, "verse_no": 1},
            {"surah_no": 1, "verse_no": 99},
            {"surah_no": 112, "verse_no": 1}
        ]"#;
        let state = state_with(StubMatcher::replying(reply), Config::default());

        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].candidate.surah_no, 112);
        assert_eq!(report.results[0].location.page, 604);
    }

    #[tokio::test]
    async fn malformed_reply_becomes_an_error_marker() {
        let state = state_with(
            StubMatcher::replying("Sorry, I could not hear that clearly."),
            Config::default(),
        );
        let report = run(&state, "u1", recording()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.failure, Some(AnalysisFailure::MalformedOutput));
        assert_eq!(report.failure.unwrap().marker(), "matcher_output_malformed");
    }

    #[tokio::test]
    async fn tiny_or_missing_uploads_skip_the_matcher() {
        let matcher = StubMatcher::replying(r#"[{"surah_no": 1, "verse_no": 1}]"#);
        let state = state_with(matcher.clone(), Config::default());

        let tiny = Some(AudioClip::new(vec![0u8; 100], "audio/wav"));
        let report = run(&state, "u1", tiny).await;
        assert!(report.results.is_empty());
        assert!(report.failure.is_none());

        let report = run(&state, "u1", None).await;
        assert!(report.results.is_empty());
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matcher_errors_are_reported_not_raised() {
        let state = state_with(
            StubMatcher::failing(PortError::Unavailable("503".to_string())),
            Config::default(),
        );
        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.failure, Some(AnalysisFailure::MatcherUnavailable));

        let state = state_with(
            StubMatcher::failing(PortError::UnsupportedMedia("audio/ogg".to_string())),
            Config::default(),
        );
        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.failure, Some(AnalysisFailure::UnsupportedAudio));
    }

    #[tokio::test]
    async fn stalled_matcher_times_out() {
        let config = Config {
            matcher_timeout: Duration::from_millis(20),
            ..Config::default()
        };
        let state = state_with(Arc::new(StalledMatcher), config);
        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.failure, Some(AnalysisFailure::MatcherTimedOut));
    }

    #[tokio::test]
    async fn shutdown_cancels_a_pending_matcher_call() {
        let state = state_with(Arc::new(StalledMatcher), Config::default());
        state.shutdown.cancel();
        let report = run(&state, "u1", recording()).await;
        assert_eq!(report.failure, Some(AnalysisFailure::ShuttingDown));
    }

    #[tokio::test]
    async fn exhausted_quota_is_rejected_before_the_matcher() {
        let matcher = StubMatcher::replying("[]");
        let config = Config {
            daily_limit: 1,
            ..Config::default()
        };
        let state = state_with(matcher.clone(), config);

        run(&state, "u1", recording()).await;
        let rejection = admit_caller(&state, &caller("u1")).unwrap_err();
        let AnalyzeRejection::QuotaExhausted(info) = rejection;
        assert!(info.limit_reached);
        assert_eq!(info.remaining, Some(0));
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 1);
    }
}
