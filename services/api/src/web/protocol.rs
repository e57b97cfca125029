//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the mobile client and the API server.
//! Core domain types stay serialization-free; everything on the wire lives here.

use hafiz_core::domain::{
    LinePosition, PageSource, QuotaInfo, QuotaStatus, ResolvedMatch,
};
use serde::Serialize;
use utoipa::ToSchema;

//=========================================================================================
// Analysis Results
//=========================================================================================

/// Whether `page_no` came from curated page data or the density estimate.
#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageSourcePayload {
    Exact,
    Estimated,
}

impl From<PageSource> for PageSourcePayload {
    fn from(source: PageSource) -> Self {
        match source {
            PageSource::Exact => Self::Exact,
            PageSource::Estimated => Self::Estimated,
        }
    }
}

/// Coarse position of the verse on its page.
#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinePositionPayload {
    Upper,
    Middle,
    Lower,
}

impl From<LinePosition> for LinePositionPayload {
    fn from(position: LinePosition) -> Self {
        match position {
            LinePosition::Upper => Self::Upper,
            LinePosition::Middle => Self::Middle,
            LinePosition::Lower => Self::Lower,
        }
    }
}

/// One place in the Quran the recitation matches.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MatchPayload {
    pub surah_no: u16,
    pub verse_no: u16,
    pub surah_name: String,
    pub arabic: String,
    pub translation: String,
    pub page_no: u16,
    pub page_source: PageSourcePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_position: Option<LinePositionPayload>,
}

impl From<ResolvedMatch> for MatchPayload {
    fn from(resolved: ResolvedMatch) -> Self {
        let ResolvedMatch {
            candidate,
            location,
        } = resolved;
        // The table-derived line wins over whatever the model suggested.
        let line_no = location.line.map(|l| l.line).or(candidate.line_no);
        Self {
            surah_no: candidate.surah_no,
            verse_no: candidate.verse_no,
            surah_name: candidate.surah_name,
            arabic: candidate.arabic,
            translation: candidate.translation,
            page_no: location.page,
            page_source: location.source.into(),
            line_no,
            line_position: location.line.map(|l| l.position.into()),
        }
    }
}

//=========================================================================================
// Quota Payloads
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, Clone, Copy)]
pub struct QuotaInfoPayload {
    pub limit_reached: bool,
    /// `null` for premium callers.
    pub remaining: Option<u32>,
    pub limit: u32,
    pub premium: bool,
}

impl From<QuotaInfo> for QuotaInfoPayload {
    fn from(info: QuotaInfo) -> Self {
        Self {
            limit_reached: info.limit_reached,
            remaining: info.remaining,
            limit: info.limit,
            premium: info.premium,
        }
    }
}

/// The response body of `POST /analyze`.
#[derive(Serialize, ToSchema, Debug)]
pub struct AnalyzeResponse {
    pub results: Vec<MatchPayload>,
    pub quota_info: QuotaInfoPayload,
    /// Machine-readable failure marker; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sent with HTTP 429 once the caller's daily attempts are used up.
#[derive(Serialize, ToSchema, Debug)]
pub struct QuotaExceededResponse {
    pub error: String,
    pub message: String,
    pub quota_info: QuotaInfoPayload,
}

impl QuotaExceededResponse {
    pub fn new(info: QuotaInfo) -> Self {
        Self {
            error: "quota_exhausted".to_string(),
            message: "Daily analysis limit reached. Try again tomorrow or earn a bonus attempt."
                .to_string(),
            quota_info: info.into(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GrantResponse {
    pub remaining: Option<u32>,
    pub limit: u32,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct QuotaStatusResponse {
    pub remaining: Option<u32>,
    pub limit: u32,
    pub premium: bool,
}

impl From<QuotaStatus> for QuotaStatusResponse {
    fn from(status: QuotaStatus) -> Self {
        Self {
            remaining: status.remaining,
            limit: status.limit,
            premium: status.premium,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
