use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// Where a series is read from, parsed from its source name:
///
/// - `bc:<name>`: boundary hydrograph `<name>` (`[n, 2]` time/value)
/// - `cell:<area>:<index>`: one cell column of an unsteady result block
/// - anything else: a dataset path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesSource {
    Boundary { name: String },
    Cell { area: String, index: usize },
    Dataset { path: String },
}

impl FromStr for SeriesSource {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SeriesError::InvalidSource {
            source_name: s.to_string(),
            reason: reason.to_string(),
        };
        let s_trim = s.trim();
        if let Some(name) = s_trim.strip_prefix("bc:") {
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid("empty boundary name"));
            }
            return Ok(SeriesSource::Boundary {
                name: name.to_string(),
            });
        }
        if let Some(rest) = s_trim.strip_prefix("cell:") {
            let (area, index) = rest
                .rsplit_once(':')
                .ok_or_else(|| invalid("expected cell:<area>:<index>"))?;
            let index = index
                .trim()
                .parse()
                .map_err(|_| invalid("cell index is not a non-negative integer"))?;
            if area.trim().is_empty() {
                return Err(invalid("empty flow area name"));
            }
            return Ok(SeriesSource::Cell {
                area: area.trim().to_string(),
                index,
            });
        }
        if s_trim.is_empty() {
            return Err(invalid("empty source name"));
        }
        Ok(SeriesSource::Dataset {
            path: s_trim.to_string(),
        })
    }
}

impl fmt::Display for SeriesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesSource::Boundary { name } => write!(f, "bc:{name}"),
            SeriesSource::Cell { area, index } => write!(f, "cell:{area}:{index}"),
            SeriesSource::Dataset { path } => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Recognises common spellings ("hr", "Hours", "days", "sec", ...).
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    pub fn hours(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0 / 3600.0,
            TimeUnit::Minutes => 1.0 / 60.0,
            TimeUnit::Hours => 1.0,
            TimeUnit::Days => 24.0,
        }
    }
}
