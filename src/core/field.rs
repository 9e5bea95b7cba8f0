//! Field types and declarative per-field validation rules
//!
//! A [`FieldSchema`] declares what a single resource field looks like: its
//! base type plus validation rules. Schemas are built once at startup and
//! shared immutably; validation both checks a raw value and coerces it to
//! the declared type (URL query parameters always arrive as strings).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::sync::OnceLock;

/// The declared base type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    String,
    Date,
    Boolean,
}

impl FieldType {
    /// Lowercase name used in operator-compatibility error messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
        }
    }
}

/// Declared type and validation rules for a single field
///
/// Built fluently, in declaration order:
///
/// ```rust
/// use resourceful::core::field::FieldSchema;
///
/// let id = FieldSchema::number().integer().positive().required();
/// let email = FieldSchema::string().max_length(100).email().required();
/// ```
#[derive(Debug, Clone)]
pub struct FieldSchema {
    field_type: FieldType,
    required: bool,
    integer: bool,
    positive: bool,
    min: Option<f64>,
    max: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    one_of: Option<Vec<String>>,
    email: bool,
}

impl FieldSchema {
    fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            integer: false,
            positive: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            one_of: None,
            email: false,
        }
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Restrict string values to an allowed set
    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.one_of = Some(allowed.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Validate a raw value against this schema, coercing it to the declared
    /// type. `label` names the field in error messages (e.g. `id`,
    /// `includes[0]`).
    ///
    /// Returns the normalized value on success, the first failing rule's
    /// message on failure.
    pub fn check(&self, label: &str, value: &Value) -> Result<Value, String> {
        match self.field_type {
            FieldType::Number => self.check_number(label, value),
            FieldType::String => self.check_string(label, value),
            FieldType::Date => self.check_date(label, value),
            FieldType::Boolean => self.check_boolean(label, value),
        }
    }

    fn check_number(&self, label: &str, value: &Value) -> Result<Value, String> {
        let num = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let num = num.ok_or_else(|| format!("\"{}\" must be a number", label))?;

        if self.integer && num.fract() != 0.0 {
            return Err(format!("\"{}\" must be an integer", label));
        }
        if self.positive && num <= 0.0 {
            return Err(format!("\"{}\" must be a positive number", label));
        }
        if let Some(min) = self.min {
            if num < min {
                return Err(format!(
                    "\"{}\" must be greater than or equal to {}",
                    label, min
                ));
            }
        }
        if let Some(max) = self.max {
            if num > max {
                return Err(format!(
                    "\"{}\" must be less than or equal to {}",
                    label, max
                ));
            }
        }

        // Integral values normalize to i64 so they serialize without a
        // trailing `.0`.
        if num.fract() == 0.0 && num.abs() < i64::MAX as f64 {
            Ok(Value::Number(Number::from(num as i64)))
        } else {
            Ok(Number::from_f64(num)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
    }

    fn check_string(&self, label: &str, value: &Value) -> Result<Value, String> {
        let s = value
            .as_str()
            .ok_or_else(|| format!("\"{}\" must be a string", label))?;

        if let Some(min) = self.min_length {
            if s.chars().count() < min {
                return Err(format!(
                    "\"{}\" length must be at least {} characters long",
                    label, min
                ));
            }
        }
        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                return Err(format!(
                    "\"{}\" length must be less than or equal to {} characters long",
                    label, max
                ));
            }
        }
        if let Some(allowed) = &self.one_of {
            if !allowed.iter().any(|a| a == s) {
                return Err(format!(
                    "\"{}\" must be one of [{}]",
                    label,
                    allowed.join(", ")
                ));
            }
        }
        if self.email && !is_valid_email(s) {
            return Err(format!("\"{}\" must be a valid email", label));
        }

        Ok(Value::String(s.to_string()))
    }

    fn check_date(&self, label: &str, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(s) => parse_datetime(s)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| format!("\"{}\" must be a valid date", label)),
            // Millisecond timestamps are accepted too
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| format!("\"{}\" must be a valid date", label)),
            _ => Err(format!("\"{}\" must be a valid date", label)),
        }
    }

    fn check_boolean(&self, label: &str, value: &Value) -> Result<Value, String> {
        match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(format!("\"{}\" must be a boolean", label)),
        }
    }
}

/// Parse the date formats the layer accepts: RFC 3339, `YYYY-MM-DD` and
/// `YYYY-MM-DD HH:MM:SS` (both read as UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    None
}

fn is_valid_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
    regex.is_match(email)
}
