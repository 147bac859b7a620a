// src/validate/period.rs
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// Spanish month abbreviations as they appear in the report metadata.
const MONTHS: [(&str, u32); 12] = [
    ("ene", 1),
    ("feb", 2),
    ("mar", 3),
    ("abr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dic", 12),
];

/// Token offsets of `<day> <month> <year>` on the period line.
const START_TOKENS: usize = 3;
const END_TOKENS: usize = 8;
const MIN_TOKENS: usize = 11;

/// A reporting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for Period {
    fn from(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Why a metadata block and a storage key do not describe the same period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodFailure {
    #[error("metadata cell is empty")]
    MissingMetadata,

    #[error("metadata text is blank")]
    BlankMetadata,

    #[error("metadata has no line break: {preview:?}")]
    SingleLine { preview: String },

    #[error("metadata period line has {found} tokens, expected at least 11: {line:?}")]
    TooFewTokens { found: usize, line: String },

    #[error("unknown month abbreviation {token:?}")]
    UnknownMonth { token: String },

    #[error("invalid {which} date {text:?}")]
    InvalidDate { which: &'static str, text: String },

    #[error("storage key {key:?} has no year=YYYY/month=MM folders above the file name")]
    MalformedKey { key: String },

    #[error("metadata period {start} to {end} does not match file period {file}")]
    Mismatch {
        start: NaiveDate,
        end: NaiveDate,
        file: Period,
    },
}

/// Month number for a month word, judged by its first three letters
/// (`Mar`, `marzo`, `MAR.` all map to 3).
pub fn month_from_token(token: &str) -> Option<u32> {
    let abbrev: String = token
        .chars()
        .take(3)
        .flat_map(char::to_lowercase)
        .collect();
    MONTHS
        .iter()
        .find(|(name, _)| *name == abbrev)
        .map(|(_, n)| *n)
}

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Day-first date from three tokens: `<day> <month-word> <year>`.
fn parse_date(tokens: &[&str], which: &'static str) -> Result<NaiveDate, PeriodFailure> {
    let text = tokens.join(" ");
    let invalid = || PeriodFailure::InvalidDate {
        which,
        text: text.clone(),
    };
    let [day, month, year] = tokens else {
        return Err(invalid());
    };

    let month_word = clean_token(month);
    let month = month_from_token(month_word).ok_or_else(|| PeriodFailure::UnknownMonth {
        token: month_word.to_string(),
    })?;
    let day: u32 = clean_token(day).parse().map_err(|_| invalid())?;
    let mut year: i32 = clean_token(year).parse().map_err(|_| invalid())?;
    if (0..100).contains(&year) {
        year += 2000;
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parse the start and end dates out of a metadata block. Line 1 carries the range
/// at fixed token offsets; line 0 is a label.
pub fn parse_metadata_range(metadata: &str) -> Result<(NaiveDate, NaiveDate), PeriodFailure> {
    if metadata.trim().is_empty() {
        return Err(PeriodFailure::BlankMetadata);
    }
    let normalized = metadata.replace('\r', "");
    let Some(line) = normalized.split('\n').nth(1) else {
        return Err(PeriodFailure::SingleLine {
            preview: metadata.chars().take(20).collect(),
        });
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return Err(PeriodFailure::TooFewTokens {
            found: tokens.len(),
            line: line.to_string(),
        });
    }

    let start = parse_date(&tokens[START_TOKENS..START_TOKENS + 3], "start")?;
    let end = parse_date(&tokens[END_TOKENS..END_TOKENS + 3], "end")?;
    Ok((start, end))
}

/// Period encoded in `<prefix>/year=YYYY/month=MM/<file>`: the two folders directly
/// above the file name.
pub fn period_from_key(key: &str) -> Result<Period, PeriodFailure> {
    let malformed = || PeriodFailure::MalformedKey {
        key: key.to_string(),
    };
    let segments: Vec<&str> = key.split('/').collect();
    let [.., year_seg, month_seg, file] = segments.as_slice() else {
        return Err(malformed());
    };
    if file.is_empty() {
        return Err(malformed());
    }

    let year: i32 = year_seg
        .strip_prefix("year=")
        .and_then(|y| y.parse().ok())
        .ok_or_else(malformed)?;
    let month: u32 = month_seg
        .strip_prefix("month=")
        .and_then(|m| m.parse().ok())
        .ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .map(Period::from)
        .ok_or_else(malformed)
}

/// Cross-check the metadata period against the key period. Never panics: every
/// malformed input resolves to a `PeriodFailure`, which is logged here.
pub fn check_period(metadata: Option<&str>, key: &str) -> Result<Period, PeriodFailure> {
    let Some(metadata) = metadata else {
        warn!(key, "metadata cell is empty");
        return Err(PeriodFailure::MissingMetadata);
    };

    let (start, end) = parse_metadata_range(metadata).inspect_err(|e| {
        warn!(key, error = %e, "could not parse metadata period");
    })?;

    let file = period_from_key(key).inspect_err(|e| {
        error!(key, error = %e, "unexpected storage key layout");
    })?;

    let (start_p, end_p) = (Period::from(start), Period::from(end));
    if start_p == file && end_p == file {
        Ok(file)
    } else {
        warn!(
            key,
            metadata_start = %start,
            metadata_end = %end,
            file_period = %file,
            "metadata period does not match storage key"
        );
        Err(PeriodFailure::Mismatch { start, end, file })
    }
}

/// Boolean form of [`check_period`].
pub fn validate_period(metadata: Option<&str>, key: &str) -> bool {
    check_period(metadata, key).is_ok()
}
