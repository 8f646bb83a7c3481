//! Cleanup of scraped birthday rows.
//!
//! The remote site lists patients as "Surnames GivenNames" in upper case with
//! `DD/MM` birthdays. Output records are "GivenNames Surnames" in title case
//! with an ISO date in the year of execution, deduplicated on
//! (full name, birthday).

use chrono::{Datelike, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::models::record::{NormalizedRecord, RawRecord};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizationError {
    #[error("malformed record at row {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

/// Turns raw scraped rows into the download format.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    year: Option<i32>,
}

impl Normalizer {
    /// Normalizer that dates birthdays in the current year.
    pub fn new() -> Self {
        Self { year: None }
    }

    /// Normalizer pinned to a fixed year.
    pub fn for_year(year: i32) -> Self {
        Self { year: Some(year) }
    }

    pub fn normalize(
        &self,
        raw: Vec<RawRecord>,
    ) -> Result<Vec<NormalizedRecord>, NormalizationError> {
        let year = self.year.unwrap_or_else(|| Utc::now().year());
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(raw.len());
        let mut duplicates = 0usize;

        for (index, row) in raw.into_iter().enumerate() {
            let record = normalize_record(index, row, year)?;
            let key = (record.full_name.clone(), record.birthday.clone());
            if seen.insert(key) {
                records.push(record);
            } else {
                duplicates += 1;
                debug!(name = %record.full_name, "Duplicate record dropped");
            }
        }

        if duplicates > 0 {
            info!(duplicates, kept = records.len(), "Duplicate records removed");
        }

        Ok(records)
    }
}

fn normalize_record(
    index: usize,
    row: RawRecord,
    year: i32,
) -> Result<NormalizedRecord, NormalizationError> {
    let malformed = |reason: String| NormalizationError::MalformedRecord { index, reason };

    if row.name.split_whitespace().next().is_none() {
        return Err(malformed("empty name".to_string()));
    }

    let birthday = birthday_in_year(&row.birthday, year)
        .ok_or_else(|| malformed(format!("invalid birthday '{}'", row.birthday)))?;

    let age = match row.age.trim() {
        "" => None,
        age => Some(
            age.parse::<u32>()
                .map_err(|_| malformed(format!("invalid age '{}'", age)))?,
        ),
    };

    Ok(NormalizedRecord {
        full_name: format_name(&row.name),
        birthday: birthday.format("%Y-%m-%d").to_string(),
        phone: row.phone.trim().to_string(),
        age,
    })
}

/// Parse `DD/MM` into a date of `year`. 29/02 falls back to 28/02 in
/// non-leap years.
pub fn birthday_in_year(day_month: &str, year: i32) -> Option<NaiveDate> {
    let (day, month) = day_month.trim().split_once('/')?;
    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        (month == 2 && day == 29)
            .then(|| NaiveDate::from_ymd_opt(year, 2, 28))
            .flatten()
    })
}

/// Reorder "Surnames GivenNames" into "GivenNames Surnames" and title-case
/// every word.
pub fn format_name(name: &str) -> String {
    reorder_name(name)
        .iter()
        .map(|word| title_case(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn reorder_name(name: &str) -> Vec<&str> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let surnames = surname_word_count(words.len());
    let (surname_part, given_part) = words.split_at(surnames);
    given_part.iter().chain(surname_part).copied().collect()
}

/// How many leading words of an `n`-word name are surnames.
///
/// Five- and six-word names carry a three-word surname ("De La Cruz",
/// "Van Der Berg" or simply two surnames plus a particle); longer names are
/// split in half.
fn surname_word_count(n: usize) -> usize {
    match n {
        0 | 1 => 0,
        2 => 1,
        3 | 4 => 2,
        5 | 6 => 3,
        _ => n / 2,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
