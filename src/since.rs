use crate::Error;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Lower bound on article creation time, always in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Since(DateTime<Utc>);
impl Since {
    pub fn parse(s: &str) -> Result<Since, Error> {
        let s = s.trim();
        let invalid = || Error::InvalidDate(s.to_owned());
        if !s.contains('T') {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
            return Ok(Since(midnight.and_utc()));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Since(dt.with_timezone(&Utc)));
        }
        // No offset given: read it as UTC.
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Since(naive.and_utc()))
            .map_err(|_| invalid())
    }
    pub fn time(&self) -> DateTime<Utc> {
        self.0
    }
    /// The form MediaWiki accepts for `rcstart`.
    pub fn api_timestamp(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
    pub fn admits(&self, created_at: &DateTime<Utc>) -> bool {
        *created_at >= self.0
    }
}
impl FromStr for Since {
    type Err = Error;
    fn from_str(s: &str) -> Result<Since, Error> {
        Since::parse(s)
    }
}
impl From<DateTime<Utc>> for Since {
    fn from(dt: DateTime<Utc>) -> Since {
        Since(dt)
    }
}
impl fmt::Display for Since {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_timestamp())
    }
}
