//! crates/hafiz_core/src/resolver.rs
//!
//! Maps a (surah, verse) pair to a page of the print edition.
//!
//! Surahs with curated breakpoints resolve exactly. Every other surah is placed
//! with the versioned density table from `locator`, which is only an
//! approximation of the printed layout and is reported as `PageSource::Estimated`.

use crate::domain::{
    CandidateMatch, LineEstimate, LinePosition, PageLocation, PageSource, ResolvedMatch, Surah,
};
use crate::locator::{LocatorTable, LINES_PER_PAGE, PAGE_COUNT};

/// Reasons a (surah, verse) pair cannot be placed on a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("Unknown surah number: {0}")]
    UnknownSurah(u16),
    #[error("Verse {verse} is outside surah {surah}")]
    VerseOutOfRange { surah: u16, verse: u16 },
}

/// The verses printed on one page, used for the line estimate.
#[derive(Debug, Clone, Copy)]
struct VerseSpan {
    first: u16,
    len: u16,
}

impl VerseSpan {
    fn line_estimate(self, verse: u16) -> LineEstimate {
        let ratio = f32::from(verse - self.first) / f32::from(self.len.max(1));
        let position = if ratio < 0.33 {
            LinePosition::Upper
        } else if ratio < 0.66 {
            LinePosition::Middle
        } else {
            LinePosition::Lower
        };
        let line = (1 + (ratio * f32::from(LINES_PER_PAGE)) as u8).min(LINES_PER_PAGE);
        LineEstimate { line, position }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageResolver {
    table: &'static LocatorTable,
}

impl Default for PageResolver {
    fn default() -> Self {
        Self::new(LocatorTable::madani())
    }
}

impl PageResolver {
    pub fn new(table: &'static LocatorTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'static LocatorTable {
        self.table
    }

    /// Resolves a verse to its page, clamped to the edition's page range.
    pub fn resolve(&self, surah_no: u16, verse_no: u16) -> Result<PageLocation, LocatorError> {
        let surah = self
            .table
            .surah(surah_no)
            .ok_or(LocatorError::UnknownSurah(surah_no))?;
        if verse_no == 0 || verse_no > surah.verse_count {
            return Err(LocatorError::VerseOutOfRange {
                surah: surah_no,
                verse: verse_no,
            });
        }

        let exact = self
            .table
            .breakpoints(surah_no)
            .and_then(|verses| exact_page(surah, verses, verse_no));
        let (page, span, source) = match exact {
            Some((page, span)) => (page, Some(span), PageSource::Exact),
            None => {
                let (page, span) = self.estimated_page(surah, verse_no);
                (page, span, PageSource::Estimated)
            }
        };

        Ok(PageLocation {
            page: page.clamp(1, PAGE_COUNT),
            source,
            line: span.map(|s| s.line_estimate(verse_no)),
        })
    }

    /// Attaches a page to a matcher candidate. A blank surah name is replaced
    /// with the table's canonical name.
    pub fn resolve_match(&self, mut candidate: CandidateMatch) -> Result<ResolvedMatch, LocatorError> {
        let location = self.resolve(candidate.surah_no, candidate.verse_no)?;
        if candidate.surah_name.trim().is_empty() {
            if let Some(name) = self.table.name(candidate.surah_no) {
                candidate.surah_name = name.to_string();
            }
        }
        Ok(ResolvedMatch {
            candidate,
            location,
        })
    }

    fn estimated_page(&self, surah: &Surah, verse: u16) -> (u16, Option<VerseSpan>) {
        // Short surahs share their start page with neighbours, so no line is given.
        let density = self.table.density(surah.number).unwrap_or(0);
        if density == 0 {
            return (surah.start_page, None);
        }

        let offset = (verse - 1) / density;
        let page = surah.start_page + offset;
        let last_page = self.table.last_page(surah.number).unwrap_or(PAGE_COUNT);
        if page > last_page {
            return (last_page, None);
        }

        let first = offset * density + 1;
        let span = VerseSpan {
            first,
            len: density.min(surah.verse_count - first + 1),
        };
        (page, Some(span))
    }
}

fn exact_page(surah: &Surah, breakpoints: &[u16], verse: u16) -> Option<(u16, VerseSpan)> {
    // Last page whose first verse does not exceed `verse`.
    let index = breakpoints
        .partition_point(|&first| first <= verse)
        .checked_sub(1)?;
    let first = breakpoints[index];
    let end = breakpoints
        .get(index + 1)
        .copied()
        .unwrap_or(surah.verse_count + 1);
    let page = surah.start_page + u16::try_from(index).ok()?;
    Some((
        page,
        VerseSpan {
            first,
            len: end - first,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(surah: u16, verse: u16) -> u16 {
        PageResolver::default().resolve(surah, verse).unwrap().page
    }

    #[test]
    fn curated_surahs_resolve_exactly() {
        assert_eq!(page(2, 1), 2);
        assert_eq!(page(2, 5), 2);
        assert_eq!(page(2, 6), 3);
        assert_eq!(page(2, 255), 42);
        assert_eq!(page(2, 282), 48);
        assert_eq!(page(2, 286), 49);
        assert_eq!(page(3, 1), 50);
        assert_eq!(page(4, 176), 106);
        assert_eq!(page(5, 1), 106);
        assert_eq!(page(5, 120), 127);

        let location = PageResolver::default().resolve(3, 190).unwrap();
        assert_eq!(location.source, PageSource::Exact);
    }

    #[test]
    fn late_surahs_use_the_density_estimate() {
        let location = PageResolver::default().resolve(82, 6).unwrap();
        assert_eq!(location.page, 587);
        assert_eq!(location.source, PageSource::Estimated);

        assert_eq!(page(78, 30), 583);
        assert_eq!(page(100, 11), 599);
        assert_eq!(page(114, 6), 604);
        assert_eq!(page(1, 7), 1);
    }

    #[test]
    fn estimates_are_capped_at_the_next_surah() {
        let location = PageResolver::default().resolve(37, 182).unwrap();
        assert_eq!(location.page, 453);
        assert!(location.line.is_none());
    }

    #[test]
    fn short_surahs_on_a_shared_page_have_no_line_estimate() {
        let resolver = PageResolver::default();
        for surah in [112, 113, 114] {
            let location = resolver.resolve(surah, 1).unwrap();
            assert_eq!(location.page, 604);
            assert_eq!(location.source, PageSource::Estimated);
            assert!(location.line.is_none());
        }
    }

    #[test]
    fn every_verse_lands_between_its_start_page_and_the_last_page() {
        let resolver = PageResolver::default();
        for surah in resolver.table().surahs() {
            let mut previous = surah.start_page;
            for verse in 1..=surah.verse_count {
                let page = resolver.resolve(surah.number, verse).unwrap().page;
                assert!(
                    (surah.start_page..=PAGE_COUNT).contains(&page),
                    "{}:{} -> {}",
                    surah.number,
                    verse,
                    page
                );
                assert!(page >= previous, "{}:{} went backwards", surah.number, verse);
                previous = page;
            }
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = PageResolver::default();
        let first = resolver.resolve(2, 142).unwrap();
        for _ in 0..10 {
            assert_eq!(resolver.resolve(2, 142).unwrap(), first);
        }
    }

    #[test]
    fn unknown_locators_are_errors_not_page_one() {
        let resolver = PageResolver::default();
        assert_eq!(resolver.resolve(0, 1), Err(LocatorError::UnknownSurah(0)));
        assert_eq!(resolver.resolve(115, 1), Err(LocatorError::UnknownSurah(115)));
        assert_eq!(
            resolver.resolve(2, 0),
            Err(LocatorError::VerseOutOfRange { surah: 2, verse: 0 })
        );
        assert_eq!(
            resolver.resolve(1, 8),
            Err(LocatorError::VerseOutOfRange { surah: 1, verse: 8 })
        );
    }

    #[test]
    fn line_position_follows_the_verse_within_its_page() {
        let resolver = PageResolver::default();
        let top = resolver.resolve(2, 6).unwrap().line.unwrap();
        assert_eq!(top.position, LinePosition::Upper);
        assert_eq!(top.line, 1);

        let middle = resolver.resolve(2, 11).unwrap().line.unwrap();
        assert_eq!(middle.position, LinePosition::Middle);

        let bottom = resolver.resolve(2, 16).unwrap().line.unwrap();
        assert_eq!(bottom.position, LinePosition::Lower);
        assert!(bottom.line <= LINES_PER_PAGE);
    }

    #[test]
    fn blank_names_are_filled_from_the_table() {
        let candidate = CandidateMatch {
            surah_no: 82,
            verse_no: 6,
            surah_name: "  ".to_string(),
            arabic: String::new(),
            translation: String::new(),
            line_no: None,
        };
        let resolved = PageResolver::default().resolve_match(candidate).unwrap();
        assert_eq!(resolved.candidate.surah_name, "İnfitar");
        assert_eq!(resolved.location.page, 587);
    }
}
