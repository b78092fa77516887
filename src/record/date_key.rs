use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::error::InvalidDateKey;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

lazy_static! {
    static ref DATE_KEY_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex");
}

/// Canonical `YYYY-MM-DD` key identifying one daily record. Lexical order
/// equals chronological order, so these sort naturally as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey {
    raw: String,
    date: Date,
}

impl DateKey {
    pub fn parse(s: &str) -> Result<Self, InvalidDateKey> {
        if !DATE_KEY_RE.is_match(s) {
            return Err(InvalidDateKey(s.to_string()));
        }
        let date = Date::parse(s, DATE_FORMAT).map_err(|_| InvalidDateKey(s.to_string()))?;
        Ok(Self {
            raw: s.to_string(),
            date,
        })
    }

    pub fn from_date(date: Date) -> Self {
        let raw = format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        );
        Self { raw, date }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> Date {
        self.date
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for DateKey {
    type Error = InvalidDateKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DateKey> for String {
    fn from(k: DateKey) -> String {
        k.raw
    }
}
