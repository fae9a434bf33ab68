//! Loading guests, preferences and table sizes from delimited text.
//!
//! Guest lists hold one guest per record: a name and an optional gender.
//! Without a gender, one is inferred from an honorific ("Mr. ", "Mrs. ",
//! ...). Preference lists hold `name,name,score` records. Names in the
//! preferences are only checked against the guests once both are loaded,
//! with [`Preferences::check_guests`].

use std::collections::HashSet;
use std::io::Read;
use std::num::{ParseFloatError, ParseIntError};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::model::condition::{PreferenceError, Preferences, Score};
use crate::model::entity::{Gender, Guest, UnknownGender};
use crate::model::group::MIN_CAPACITY;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: too many fields ({count})")]
    TooManyFields { line: u64, count: usize },
    #[error("line {line}: empty name")]
    EmptyName { line: u64 },
    #[error("duplicate name {0:?}")]
    DuplicateName(String),
    #[error("line {line}: {source}")]
    Gender { line: u64, source: UnknownGender },
    #[error("line {line}: expected 3 fields, got {count}")]
    FieldCount { line: u64, count: usize },
    #[error("line {line}: cannot prefer self ({name:?})")]
    SelfPreference { line: u64, name: String },
    #[error("line {line}: bad preference score {value:?}")]
    BadScore { line: u64, value: String, source: ParseFloatError },
    #[error("line {line}: preference score {value:?} is not finite")]
    NonFiniteScore { line: u64, value: String },
    #[error("duplicate pref {0:?}, {1:?}")]
    DuplicatePreference(String, String),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error("bad table capacity {value:?}")]
    BadCapacity { value: String, source: ParseIntError },
    #[error("table capacity {0} must be a positive even number")]
    InvalidCapacity(i64),
    #[error("table capacity {0} is below the minimum of {}", MIN_CAPACITY)]
    SmallCapacity(i64),
    #[error("no table sizes given")]
    NoTables,
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input)
}

pub fn read_guests<R: Read>(input: R) -> Result<Vec<Guest>, LoadError> {
    let mut guests = Vec::new();
    let mut names = HashSet::new();

    for record in reader(input).records() {
        let record = record?;
        let line = line_of(&record);
        // Blank lines never reach here; the reader skips them.
        let (name, gender) = match record.len() {
            1 => (&record[0], ""),
            2 => (&record[0], &record[1]),
            count => return Err(LoadError::TooManyFields { line, count }),
        };
        if name.is_empty() {
            return Err(LoadError::EmptyName { line });
        }
        let gender = Gender::parse(gender)
            .map_err(|source| LoadError::Gender { line, source })?
            .or_else(|| Gender::infer(name));
        if !names.insert(name.to_string()) {
            return Err(LoadError::DuplicateName(name.to_string()));
        }
        guests.push(Guest::new(name, gender));
    }

    debug!(count = guests.len(), "read guests");
    Ok(guests)
}

pub fn read_preferences<R: Read>(input: R) -> Result<Preferences, LoadError> {
    let mut preferences = Preferences::new();

    for record in reader(input).records() {
        let record = record?;
        let line = line_of(&record);
        if record.len() != 3 {
            return Err(LoadError::FieldCount { line, count: record.len() });
        }
        let (a, b, value) = (&record[0], &record[1], &record[2]);
        if a.is_empty() || b.is_empty() {
            return Err(LoadError::EmptyName { line });
        }
        if a == b {
            return Err(LoadError::SelfPreference { line, name: a.to_string() });
        }
        let score: Score = value.parse().map_err(|source| LoadError::BadScore {
            line,
            value: value.to_string(),
            source,
        })?;
        if !score.is_finite() {
            return Err(LoadError::NonFiniteScore { line, value: value.to_string() });
        }
        if preferences.contains(a, b) {
            return Err(LoadError::DuplicatePreference(a.to_string(), b.to_string()));
        }
        preferences.set(a, b, score)?;
    }

    debug!(count = preferences.len(), "read preferences");
    Ok(preferences)
}

/// Parses a comma-separated list of table sizes such as `10,10,8`.
pub fn parse_capacities(list: &str) -> Result<Vec<usize>, LoadError> {
    let capacities = list
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            let capacity: i64 = field.parse().map_err(|source| LoadError::BadCapacity {
                value: field.to_string(),
                source,
            })?;
            if capacity <= 0 || capacity % 2 != 0 {
                Err(LoadError::InvalidCapacity(capacity))
            } else if capacity < MIN_CAPACITY as i64 {
                Err(LoadError::SmallCapacity(capacity))
            } else {
                Ok(capacity as usize)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if capacities.is_empty() {
        return Err(LoadError::NoTables);
    }
    Ok(capacities)
}
