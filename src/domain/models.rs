// Domain models shared by the store, the sync engine and the listing annotator

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical numeric identifier of a work, kept as its decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid work id {0:?}: expected a decimal digit sequence")]
pub struct InvalidWorkId(pub String);

impl WorkId {
    pub fn parse(raw: &str) -> Result<Self, InvalidWorkId> {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(WorkId(trimmed.to_string()))
        } else {
            Err(InvalidWorkId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorkId {
    type Err = InvalidWorkId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkId::parse(s)
    }
}

impl TryFrom<String> for WorkId {
    type Error = InvalidWorkId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WorkId::parse(&value)
    }
}

impl From<WorkId> for String {
    fn from(id: WorkId) -> Self {
        id.0
    }
}

impl From<u64> for WorkId {
    fn from(n: u64) -> Self {
        WorkId(n.to_string())
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two paginated listings the sync engine knows how to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    History,
    Bookmarks,
}

impl ListingKind {
    pub const ALL: [ListingKind; 2] = [ListingKind::History, ListingKind::Bookmarks];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::History => "history",
            ListingKind::Bookmarks => "bookmarks",
        }
    }

    /// Last path segment of the listing under `/users/<name>/`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ListingKind::History => "readings",
            ListingKind::Bookmarks => "bookmarks",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ListingKind::History => 0,
            ListingKind::Bookmarks => 1,
        }
    }
}

impl FromStr for ListingKind {
    type Err = String;

    /// Accepts the kind name or the listing's path segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "history" | "readings" => Ok(ListingKind::History),
            "bookmarks" => Ok(ListingKind::Bookmarks),
            other => Err(format!("unknown listing kind {other:?}")),
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User rating on the 0-9 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rating must be a whole number between 0 and 9, got {0:?}")]
pub struct InvalidRating(pub String);

impl Rating {
    pub const MAX: u8 = 9;

    pub fn new(value: i64) -> Result<Self, InvalidRating> {
        match u8::try_from(value) {
            Ok(v) if v <= Self::MAX => Ok(Rating(v)),
            _ => Err(InvalidRating(value.to_string())),
        }
    }

    /// Parse free-form user input such as the answer to a rating prompt.
    pub fn parse(input: &str) -> Result<Self, InvalidRating> {
        input
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidRating(input.to_string()))
            .and_then(Rating::new)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Display colour for the rating badge.
    pub fn color(&self) -> &'static str {
        match self.0 {
            8.. => "#5cb85c",
            6..=7 => "#5bc0de",
            4..=5 => "#f0ad4e",
            2..=3 => "#d9534f",
            _ => "#999999",
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

/// Per-work user data. Every field is optional and updated independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_chapters: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preference {
    AutoCount,
    AutoSort,
    HideHitcount,
    HighlightRead,
}

impl Preference {
    pub const ALL: [Preference; 4] = [
        Preference::AutoCount,
        Preference::AutoSort,
        Preference::HideHitcount,
        Preference::HighlightRead,
    ];

    pub fn default_value(&self) -> bool {
        !matches!(self, Preference::AutoSort)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::AutoCount => "autoCount",
            Preference::AutoSort => "autoSort",
            Preference::HideHitcount => "hideHitcount",
            Preference::HighlightRead => "highlightRead",
        }
    }
}

impl FromStr for Preference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preference::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preference {s:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub auto_count: bool,
    pub auto_sort: bool,
    pub hide_hitcount: bool,
    pub highlight_read: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            auto_count: Preference::AutoCount.default_value(),
            auto_sort: Preference::AutoSort.default_value(),
            hide_hitcount: Preference::HideHitcount.default_value(),
            highlight_read: Preference::HighlightRead.default_value(),
        }
    }
}

impl Preferences {
    pub fn set(&mut self, pref: Preference, value: bool) {
        match pref {
            Preference::AutoCount => self.auto_count = value,
            Preference::AutoSort => self.auto_sort = value,
            Preference::HideHitcount => self.hide_hitcount = value,
            Preference::HighlightRead => self.highlight_read = value,
        }
    }
}

/// Chapter counter as shown in a listing blurb, e.g. "3/10" or "3/?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterProgress {
    pub current: u32,
    /// `None` when the work's final length is unknown.
    pub total: Option<u32>,
}

impl ChapterProgress {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(2, '/');
        let current = parse_count(parts.next()?)?;
        let total = match parts.next() {
            Some(rest) => parse_count(rest),
            None => Some(current),
        };
        Some(ChapterProgress { current, total })
    }

    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|t| self.current >= t)
    }
}

/// Parse a displayed count like "1,024", ignoring separators and whitespace.
pub fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
