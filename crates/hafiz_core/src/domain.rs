//! crates/hafiz_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization format.

use bytes::Bytes;
use std::fmt;

/// Identity used to key quota records when the caller sends no user id.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// A single surah of the canonical print edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surah {
    pub number: u16,
    pub name: &'static str,
    pub start_page: u16,
    pub verse_count: u16,
}

/// An uploaded recording together with its declared MIME type.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One location the matcher believes the recitation came from.
///
/// Mutashabih passages produce one candidate per occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub surah_no: u16,
    pub verse_no: u16,
    pub surah_name: String,
    pub arabic: String,
    pub translation: String,
    /// Line number suggested by the matcher, if it offered one.
    pub line_no: Option<u8>,
}

/// How a page number was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// Looked up from the curated per-page breakpoints.
    Exact,
    /// Derived from an average verses-per-page density. Heuristic.
    Estimated,
}

/// Coarse vertical position of a verse on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePosition {
    Upper,
    Middle,
    Lower,
}

/// Best-effort line estimate on a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEstimate {
    pub line: u8,
    pub position: LinePosition,
}

/// Output of the page resolver for a single (surah, verse) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocation {
    pub page: u16,
    pub source: PageSource,
    pub line: Option<LineEstimate>,
}

/// A candidate enriched with its canonical page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub candidate: CandidateMatch,
    pub location: PageLocation,
}

/// Quota record key: a user id, or the anonymous sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Builds an identity from a raw header value; blank values fall back to anonymous.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_IDENTITY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_IDENTITY
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quota details returned alongside every admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    pub limit_reached: bool,
    /// `None` for premium callers, who are not metered.
    pub remaining: Option<u32>,
    pub limit: u32,
    pub premium: bool,
}

/// Result of `QuotaTracker::check_and_consume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub info: QuotaInfo,
}

/// Read-only quota snapshot for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub remaining: Option<u32>,
    pub limit: u32,
    pub premium: bool,
}
