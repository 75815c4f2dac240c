//! Metric keyword classification
//!
//! Maps free text onto one canonical metric label. The rule table is
//! evaluated top to bottom and the first keyword with any matching pattern
//! wins, so the table order is part of the contract.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical sabermetric label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    #[serde(rename = "OPS")]
    Ops,
    #[serde(rename = "ERA")]
    Era,
    #[serde(rename = "FIP")]
    Fip,
    #[serde(rename = "wRC+")]
    WrcPlus,
    #[serde(rename = "WAR")]
    War,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Keyword {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Ops => "OPS",
            Keyword::Era => "ERA",
            Keyword::Fip => "FIP",
            Keyword::WrcPlus => "wRC+",
            Keyword::War => "WAR",
            Keyword::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// An abbreviation only counts when the next char is not [a-z0-9]; "(?:[^a-z0-9]|$)"
// stands in for a negative lookahead, which the regex crate does not support.
const RULES: &[(Keyword, &[&str])] = &[
    (
        Keyword::Ops,
        &[
            r"ops(?:[^a-z0-9]|$)",
            r"on[- ]?base plus slugging",
            r"\bobp[+ ]+slg\b",
        ],
    ),
    (Keyword::Era, &[r"era(?:[^a-z0-9]|$)", r"earned run average"]),
    (
        Keyword::Fip,
        &[r"fip(?:[^a-z0-9]|$)", r"fielding independent pitching"],
    ),
    (
        Keyword::WrcPlus,
        &[
            r"wrc\+(?:[^a-z0-9]|$)",
            r"weighted runs created plus",
            r"wrc(?:[^a-z0-9]|$)",
        ],
    ),
    (Keyword::War, &[r"war(?:[^a-z0-9]|$)", r"wins above replacement"]),
];

static COMPILED: Lazy<Vec<(Keyword, Vec<Regex>)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|(keyword, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("keyword patterns are valid regexes"))
                .collect();
            (*keyword, compiled)
        })
        .collect()
});

/// Classify text into a metric keyword, or [`Keyword::Unknown`].
///
/// Total over all inputs, including the empty string.
#[must_use]
pub fn classify(text: &str) -> Keyword {
    let normalized = text.to_lowercase();
    COMPILED
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(&normalized)))
        .map_or(Keyword::Unknown, |(keyword, _)| *keyword)
}
