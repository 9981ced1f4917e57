//! The typed data model: [`DataType`], [`Value`], [`CastOptions`], and [`TypeTester`].

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromStr;

use crate::error::TabulateError;

/// The kind of value a column holds. Column equality, join-key coercion,
/// and `merge` compatibility all compare at this granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    TimeDelta,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::TimeDelta => "TimeDelta",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A naive or zone-attached date-time. A configured timezone is attached to
/// naive parses without converting the wall-clock value (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    Naive(NaiveDateTime),
    Zoned(NaiveDateTime, FixedOffset),
}

impl DateTimeValue {
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Naive(dt) | Self::Zoned(dt, _) => *dt,
        }
    }
}

/// A signed duration, stored with millisecond precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeDelta(pub i64);

impl TimeDelta {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }
}

/// A nullable native value. `Null` is the sentinel shared by every column
/// type; nullity is tracked per cell, never per column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Text(String),
    Number(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTimeValue),
    TimeDelta(TimeDelta),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(DataType::Text),
            Value::Number(_) => Some(DataType::Number),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Date(_) => Some(DataType::Date),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::TimeDelta(_) => Some(DataType::TimeDelta),
        }
    }

    /// Render as a CSV-safe textual form (bare decimals, ISO 8601 dates,
    /// empty string for null).
    pub fn to_csv_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(d) => d.normalize().to_string(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(DateTimeValue::Naive(dt)) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::DateTime(DateTimeValue::Zoned(dt, tz)) => {
                format!("{}{}", dt.format("%Y-%m-%dT%H:%M:%S"), tz)
            }
            Value::TimeDelta(td) => format!("{}ms", td.0),
        }
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(d) => serde_json::Number::from_str(&d.normalize().to_string())
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::String(d.to_string())),
            other => serde_json::Value::String(other.to_csv_string()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.partial_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.naive().partial_cmp(&b.naive()),
            (Value::TimeDelta(a), Value::TimeDelta(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Number parsing/formatting symbols. Percent strips the `%` but does not
/// divide; currency symbols are stripped outright.
#[derive(Clone, Debug)]
pub struct NumberOptions {
    pub group_symbol: char,
    pub decimal_symbol: char,
    pub currency_symbols: Vec<char>,
}

impl Default for NumberOptions {
    fn default() -> Self {
        Self {
            group_symbol: ',',
            decimal_symbol: '.',
            currency_symbols: vec!['$', '€', '£', '¥'],
        }
    }
}

/// True/false string sets for [`DataType::Boolean`].
#[derive(Clone, Debug)]
pub struct BooleanOptions {
    pub true_strings: HashSet<String>,
    pub false_strings: HashSet<String>,
}

impl Default for BooleanOptions {
    fn default() -> Self {
        Self {
            true_strings: ["yes", "y", "true", "t", "1"].iter().map(|s| s.to_string()).collect(),
            false_strings: ["no", "n", "false", "f", "0"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Common date/date-time parse patterns tried in order when no explicit
/// format is configured.
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
];

const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M %p",
];

/// Per-column cast configuration: null-string set plus type-specific
/// formatting options (§4.1). Shared by every column unless overridden.
#[derive(Clone, Debug)]
pub struct CastOptions {
    pub null_strings: HashSet<String>,
    pub number: NumberOptions,
    pub boolean: BooleanOptions,
    pub date_format: Option<String>,
    pub datetime_format: Option<String>,
    pub timezone: Option<FixedOffset>,
}

impl Default for CastOptions {
    fn default() -> Self {
        Self {
            null_strings: ["", "na", "n/a", "none", "null", ".", "-"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            number: NumberOptions::default(),
            boolean: BooleanOptions::default(),
            date_format: None,
            datetime_format: None,
            timezone: None,
        }
    }
}

impl CastOptions {
    fn is_null_string(&self, trimmed: &str) -> bool {
        self.null_strings.contains(&trimmed.to_lowercase())
    }

    /// Cast a raw textual input into a typed [`Value`] under `data_type`.
    /// Whitespace is trimmed; case-insensitive null-strings yield `Value::Null`.
    pub fn cast(
        &self,
        data_type: DataType,
        input: &str,
        row: usize,
        column: &str,
    ) -> Result<Value, TabulateError> {
        let trimmed = input.trim();
        if self.is_null_string(trimmed) {
            return Ok(Value::Null);
        }
        let fail = || TabulateError::Cast {
            row,
            column: column.to_string(),
            input: input.to_string(),
            type_name: data_type.name(),
        };
        match data_type {
            DataType::Text => Ok(Value::Text(trimmed.to_string())),
            DataType::Number => self.cast_number(trimmed).map(Value::Number).ok_or_else(fail),
            DataType::Boolean => self.cast_boolean(trimmed).map(Value::Boolean).ok_or_else(fail),
            DataType::Date => self.cast_date(trimmed).map(Value::Date).ok_or_else(fail),
            DataType::DateTime => self
                .cast_datetime(trimmed)
                .map(Value::DateTime)
                .ok_or_else(fail),
            DataType::TimeDelta => self
                .cast_timedelta(trimmed)
                .map(Value::TimeDelta)
                .ok_or_else(fail),
        }
    }

    fn cast_boolean(&self, trimmed: &str) -> Option<bool> {
        let lower = trimmed.to_lowercase();
        if self.boolean.true_strings.contains(&lower) {
            Some(true)
        } else if self.boolean.false_strings.contains(&lower) {
            Some(false)
        } else {
            None
        }
    }

    fn cast_number(&self, trimmed: &str) -> Option<Decimal> {
        let mut s: String = trimmed
            .chars()
            .filter(|c| !self.number.currency_symbols.contains(c))
            .collect();
        let had_percent = s.ends_with('%');
        if had_percent {
            s.pop();
        }
        s = s.trim().to_string();
        let negative_paren = s.starts_with('(') && s.ends_with(')');
        if negative_paren {
            s = s[1..s.len() - 1].to_string();
        }
        s = s.replace(self.number.group_symbol, "");
        if self.number.decimal_symbol != '.' {
            if s.matches(self.number.decimal_symbol).count() > 1 {
                return None;
            }
            s = s.replace(self.number.decimal_symbol, ".");
        }
        if s.matches('.').count() > 1 {
            return None;
        }
        if negative_paren {
            s.insert(0, '-');
        }
        Decimal::from_str(&s).ok()
    }

    fn cast_date(&self, trimmed: &str) -> Option<NaiveDate> {
        if let Some(fmt) = &self.date_format {
            return NaiveDate::parse_from_str(trimmed, fmt).ok();
        }
        DATE_PATTERNS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    }

    fn cast_datetime(&self, trimmed: &str) -> Option<DateTimeValue> {
        if let Some(fmt) = &self.datetime_format {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(self.attach_timezone(dt));
            }
            return None;
        }
        if let Some(dt) = DATETIME_PATTERNS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        {
            return Some(self.attach_timezone(dt));
        }
        // A bare date also satisfies DateTime, at midnight.
        self.cast_date(trimmed)
            .map(|d| self.attach_timezone(d.and_hms_opt(0, 0, 0).unwrap()))
    }

    fn attach_timezone(&self, naive: NaiveDateTime) -> DateTimeValue {
        match self.timezone {
            Some(tz) => DateTimeValue::Zoned(naive, tz),
            None => DateTimeValue::Naive(naive),
        }
    }

    fn cast_timedelta(&self, trimmed: &str) -> Option<TimeDelta> {
        let (sign, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, trimmed),
        };
        let mut total_ms: i64 = 0;
        let mut num = String::new();
        let mut unit = String::new();
        let mut saw_any = false;
        for c in rest.chars().chain(std::iter::once(' ')) {
            if c.is_ascii_digit() || c == '.' {
                if !unit.is_empty() {
                    total_ms += Self::unit_millis(&num, &unit)?;
                    num.clear();
                    unit.clear();
                }
                num.push(c);
            } else if c.is_whitespace() {
                if !num.is_empty() && !unit.is_empty() {
                    total_ms += Self::unit_millis(&num, &unit)?;
                    saw_any = true;
                    num.clear();
                    unit.clear();
                }
            } else {
                unit.push(c);
            }
        }
        if !num.is_empty() && !unit.is_empty() {
            total_ms += Self::unit_millis(&num, &unit)?;
            saw_any = true;
        }
        if saw_any {
            Some(TimeDelta(sign * total_ms))
        } else {
            None
        }
    }

    fn unit_millis(num: &str, unit: &str) -> Option<i64> {
        let n: f64 = num.parse().ok()?;
        let per_unit_ms: f64 = match unit.to_lowercase().trim_end_matches('s') {
            "w" | "week" => 7.0 * 24.0 * 3_600_000.0,
            "d" | "day" => 24.0 * 3_600_000.0,
            "h" | "hr" | "hour" => 3_600_000.0,
            "m" | "min" | "minute" => 60_000.0,
            "s" | "sec" | "second" => 1_000.0,
            "ms" | "milli" | "millisecond" => 1.0,
            _ => return None,
        };
        Some((n * per_unit_ms).round() as i64)
    }
}

/// Default type-inference priority: most specific first, Text as fallback (§4.1).
pub const DEFAULT_TYPE_PRIORITY: &[DataType] = &[
    DataType::Boolean,
    DataType::Number,
    DataType::TimeDelta,
    DataType::Date,
    DataType::DateTime,
    DataType::Text,
];

/// Infers a [`DataType`] per column from a sample of textual cells.
pub struct TypeTester {
    pub limit: Option<usize>,
    pub types: Vec<DataType>,
    pub force: std::collections::HashMap<String, DataType>,
    pub options: CastOptions,
}

impl Default for TypeTester {
    fn default() -> Self {
        Self {
            limit: None,
            types: DEFAULT_TYPE_PRIORITY.to_vec(),
            force: std::collections::HashMap::new(),
            options: CastOptions::default(),
        }
    }
}

impl TypeTester {
    /// Infer the [`DataType`] of one column given its sampled textual cells.
    pub fn infer_column(&self, column_name: &str, cells: &[&str]) -> DataType {
        if let Some(forced) = self.force.get(column_name) {
            return *forced;
        }
        let sample: Vec<&&str> = match self.limit {
            Some(limit) => cells.iter().take(limit).collect(),
            None => cells.iter().collect(),
        };
        for candidate in &self.types {
            let all_cast = sample.iter().all(|cell| {
                self.options
                    .cast(*candidate, cell, 0, column_name)
                    .is_ok()
            });
            if all_cast {
                return *candidate;
            }
        }
        DataType::Text
    }

    /// Infer DataTypes for every named column given parallel sampled cells.
    /// Warns if `force` names a column absent from `column_names`.
    pub fn infer(
        &self,
        column_names: &[String],
        columns: &[Vec<&str>],
    ) -> Vec<DataType> {
        for forced_name in self.force.keys() {
            if !column_names.iter().any(|n| n == forced_name) {
                tracing::warn!(column = %forced_name, "force names a column missing from the sample");
            }
        }
        column_names
            .iter()
            .zip(columns.iter())
            .map(|(name, cells)| self.infer_column(name, cells))
            .collect()
    }
}
