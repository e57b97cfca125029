//! services/api/src/web/candidates.rs
//!
//! Turns the matcher's free-form text reply into candidate matches.
//!
//! Models often wrap JSON in Markdown fences or add a sentence around it, so the
//! reply is unwrapped before parsing. Elements that cannot be read, or that carry
//! a missing or zero surah/verse, are skipped rather than failing the whole reply.

use hafiz_core::domain::CandidateMatch;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("valid fence regex"));

#[derive(Debug, thiserror::Error)]
pub enum CandidateParseError {
    #[error("Matcher output is not a JSON candidate list: {0}")]
    Malformed(String),
}

/// A number the model may send bare or quoted (`2` or `"2"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(i64),
    Text(String),
}

impl LooseNumber {
    fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default, alias = "surah", alias = "sure_no")]
    surah_no: Option<LooseNumber>,
    #[serde(default, alias = "verse", alias = "ayah_no", alias = "ayet_no")]
    verse_no: Option<LooseNumber>,
    #[serde(default, alias = "sure_adi")]
    surah_name: Option<String>,
    #[serde(default, alias = "arabic_text")]
    arabic: Option<String>,
    #[serde(default, alias = "meal")]
    translation: Option<String>,
    #[serde(default, alias = "line")]
    line_no: Option<LooseNumber>,
}

impl RawCandidate {
    fn into_candidate(self) -> Option<CandidateMatch> {
        let surah_no = positive::<u16>(self.surah_no.as_ref())?;
        let verse_no = positive::<u16>(self.verse_no.as_ref())?;
        Some(CandidateMatch {
            surah_no,
            verse_no,
            surah_name: self.surah_name.unwrap_or_default().trim().to_string(),
            arabic: self.arabic.unwrap_or_default(),
            translation: self.translation.unwrap_or_default(),
            line_no: positive::<u8>(self.line_no.as_ref()),
        })
    }
}

fn positive<T: TryFrom<i64>>(number: Option<&LooseNumber>) -> Option<T> {
    number
        .and_then(LooseNumber::value)
        .filter(|n| *n > 0)
        .and_then(|n| T::try_from(n).ok())
}

/// Removes a surrounding Markdown code fence, if there is one.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => text.trim(),
    }
}

/// Parses the matcher reply into candidates. An empty JSON list is a valid
/// "no confident match" answer and yields an empty vector.
pub fn parse_candidates(text: &str) -> Result<Vec<CandidateMatch>, CandidateParseError> {
    let body = strip_code_fence(text);
    let value = parse_json(body)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results").or_else(|| map.remove("matches")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CandidateParseError::Malformed(
                    "JSON object without a results array".to_string(),
                ))
            }
        },
        other => {
            return Err(CandidateParseError::Malformed(format!(
                "expected a JSON array, got {}",
                other
            )))
        }
    };

    let candidates = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawCandidate>(item) {
            Ok(raw) => {
                let candidate = raw.into_candidate();
                if candidate.is_none() {
                    debug!("Dropping candidate without a usable surah/verse");
                }
                candidate
            }
            Err(e) => {
                debug!("Dropping unreadable candidate: {}", e);
                None
            }
        })
        .collect();
    Ok(candidates)
}

fn parse_json(body: &str) -> Result<Value, CandidateParseError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            // Fall back to the outermost array when the model added prose around it.
            let start = body.find('[');
            let end = body.rfind(']');
            match (start, end) {
                (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end])
                    .map_err(|e| CandidateParseError::Malformed(e.to_string())),
                _ => Err(CandidateParseError::Malformed(first_err.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_array_is_parsed() {
        let text = r#"[{"surah_no": 2, "verse_no": 255, "surah_name": "Bakara", "arabic": "اللَّهُ لَا إِلَٰهَ إِلَّا هُوَ", "translation": "Allah..."}]"#;
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].surah_no, 2);
        assert_eq!(candidates[0].verse_no, 255);
        assert_eq!(candidates[0].surah_name, "Bakara");
    }

    #[test]
    fn code_fences_are_stripped() {
        let text = "```json\n[{\"surah_no\": 112, \"verse_no\": 1}]\n```";
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].surah_no, 112);
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
    }

    #[test]
    fn surrounding_prose_is_tolerated() {
        let text = "Here is the result: [{\"surah_no\": 1, \"verse_no\": 2}] Hope it helps.";
        assert_eq!(parse_candidates(text).unwrap().len(), 1);
    }

    #[test]
    fn empty_list_means_no_match() {
        assert!(parse_candidates("[]").unwrap().is_empty());
        assert!(parse_candidates("```json\n[]\n```").unwrap().is_empty());
    }

    #[test]
    fn results_wrapper_object_is_accepted() {
        let text = r#"{"results": [{"surah": 55, "verse": 13}]}"#;
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates[0].surah_no, 55);
        assert_eq!(candidates[0].verse_no, 13);
    }

    #[test]
    fn zero_null_and_unreadable_entries_are_dropped() {
        let text = r#"[
            {"surah_no": 0, "verse_no": 3},
            {"surah_no": null, "verse_no": 3},
            {"verse_no": 3},
            {"surah_no": 2, "verse_no": 0},
            {"surah_no": "two", "verse_no": 1},
            {"surah_no": -4, "verse_no": 1},
            {"surah_no": 18, "verse_no": 10}
        ]"#;
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].surah_no, 18);
    }

    #[test]
    fn quoted_numbers_are_accepted() {
        let text = r#"[{"surah_no": "2", "verse_no": " 255 ", "line_no": "7"}]"#;
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].surah_no, 2);
        assert_eq!(candidates[0].verse_no, 255);
        assert_eq!(candidates[0].line_no, Some(7));
    }

    #[test]
    fn non_json_text_is_malformed() {
        let err = parse_candidates("Bu ayet Bakara suresinden.").unwrap_err();
        assert!(matches!(err, CandidateParseError::Malformed(_)));
        assert!(parse_candidates("").is_err());
        assert!(parse_candidates(r#"{"answer": "Bakara"}"#).is_err());
    }
}
