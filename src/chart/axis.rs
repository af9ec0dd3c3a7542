//! Axis types and the per-value checks inbound data must pass.

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Format of every timestamp the chart produces or accepts on a date axis.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_RE: &str = r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisType {
    Linear,
    Log,
    Date,
    Category,
    Multicategory,
    /// Plotly's "-": type is guessed from the data.
    Auto,
}

/// What a value on an axis has to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Timestamp,
    NonEmptyString,
    Scalar,
}

impl AxisType {
    pub fn expects(self) -> ValueKind {
        match self {
            AxisType::Linear | AxisType::Log => ValueKind::Number,
            AxisType::Date => ValueKind::Timestamp,
            AxisType::Category | AxisType::Multicategory => ValueKind::NonEmptyString,
            AxisType::Auto => ValueKind::Scalar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AxisType::Linear => "linear",
            AxisType::Log => "log",
            AxisType::Date => "date",
            AxisType::Category => "category",
            AxisType::Multicategory => "multicategory",
            AxisType::Auto => "-",
        }
    }
}

impl FromStr for AxisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "linear" => Ok(AxisType::Linear),
            "log" => Ok(AxisType::Log),
            "date" => Ok(AxisType::Date),
            "category" => Ok(AxisType::Category),
            "multicategory" => Ok(AxisType::Multicategory),
            "-" | "" => Ok(AxisType::Auto),
            other => Err(format!("unknown axis type {:?}", other)),
        }
    }
}

impl fmt::Display for AxisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Number => "number",
            ValueKind::Timestamp => "timestamp 'YYYY-MM-DD HH:mm:ss'",
            ValueKind::NonEmptyString => "non-empty string",
            ValueKind::Scalar => "non-null scalar",
        })
    }
}

/// Compiled value checks for both axes.
#[derive(Debug, Clone)]
pub struct AxisChecker {
    timestamp: Regex,
}

impl AxisChecker {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            timestamp: Regex::new(TIMESTAMP_RE)?,
        })
    }

    pub fn matches(&self, kind: ValueKind, value: &Value) -> bool {
        match kind {
            ValueKind::Number => value.is_number(),
            ValueKind::Timestamp => value.as_str().is_some_and(|s| self.timestamp.is_match(s)),
            ValueKind::NonEmptyString => value.as_str().is_some_and(|s| !s.is_empty()),
            ValueKind::Scalar => !value.is_null() && !value.is_array() && !value.is_object(),
        }
    }
}

/// Render a point in time in the chart's fixed timestamp format.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in the chart's fixed timestamp format.
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}
