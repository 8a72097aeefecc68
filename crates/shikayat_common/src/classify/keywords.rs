//! Keyword fallback classifier.
//!
//! Used when the LLM backend is unavailable or the input is empty. Rules
//! include common Urdu/Roman-Urdu terms used by citizens.

use crate::types::IssueType;

/// Confidence assigned to a keyword hit. The rules are coarse, so this sits
/// well below an LLM-reported confidence.
pub const KEYWORD_CONFIDENCE: f64 = 0.5;

type Rule = (&'static [&'static str], IssueType);

static RULES: &[Rule] = &[
    (
        &["pothole", "hole", "crater", "garhha", "گڑھا"],
        IssueType::Pothole,
    ),
    (
        &["garbage", "trash", "waste", "kachra", "کچرا", "litter"],
        IssueType::Garbage,
    ),
    (
        &["water leak", "pipe", "leak", "pani ka rasao", "پانی", "flood"],
        IssueType::WaterLeak,
    ),
    (
        &["streetlight", "street light", "lamp", "dark", "روشنی", "lait"],
        IssueType::BrokenStreetlight,
    ),
    (
        &["road damage", "asphalt", "pavement", "broken road"],
        IssueType::DamagedRoad,
    ),
    (
        &["illegal dump", "unauthorized dump", "dumping"],
        IssueType::IllegalDumping,
    ),
    (
        &["sewage", "drain", "overflow", "manhole"],
        IssueType::SewageOverflow,
    ),
];

/// First matching rule wins; rule order encodes priority.
pub fn classify_keywords(text: &str) -> Option<IssueType> {
    let lower = text.to_lowercase();
    for (keywords, issue_type) in RULES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return Some(*issue_type);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pothole_keywords() {
        assert_eq!(
            classify_keywords("Large pothole on Mall Road"),
            Some(IssueType::Pothole)
        );
    }

    #[test]
    fn test_urdu_keywords() {
        assert_eq!(classify_keywords("سڑک میں گڑھا ہے"), Some(IssueType::Pothole));
        assert_eq!(classify_keywords("yahan bohat kachra hai"), Some(IssueType::Garbage));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classify_keywords("everything is fine"), None);
    }

    #[test]
    fn test_sewage_over_garbage_priority() {
        // "overflow" alone should not be stolen by an earlier rule
        assert_eq!(
            classify_keywords("manhole overflow near the market"),
            Some(IssueType::SewageOverflow)
        );
    }
}
