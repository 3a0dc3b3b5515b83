//! Lenient field parsing for form-encoded and JSON payloads.
//!
//! Browsers submit `FormData` as strings, so numbers and flags may arrive as
//! either native JSON values or their textual form.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;

use super::errors::DomainError;

/// Returns the trimmed string when it is non-empty.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn decimal_from_str(field: &str, raw: &str) -> Result<BigDecimal, DomainError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| DomainError::Validation(format!("{field} must be a number, got '{raw}'")))
}

/// Accepts a JSON number or a numeric string. Blank strings and `null` are `None`.
pub fn decimal_from_value(field: &str, value: &Value) -> Result<Option<BigDecimal>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => decimal_from_str(field, &n.to_string()).map(Some),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => decimal_from_str(field, s).map(Some),
        _ => Err(DomainError::Validation(format!("{field} must be a number"))),
    }
}

pub fn int_from_str(field: &str, raw: &str) -> Result<i32, DomainError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| {
            DomainError::Validation(format!("{field} must be a whole number, got '{raw}'"))
        })
}

pub fn int_from_value(field: &str, value: &Value) -> Result<Option<i32>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| DomainError::Validation(format!("{field} must be a whole number"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => int_from_str(field, s).map(Some),
        _ => Err(DomainError::Validation(format!("{field} must be a whole number"))),
    }
}

pub fn bool_from_str(field: &str, raw: &str) -> Result<bool, DomainError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(DomainError::Validation(format!("{field} must be true or false, got '{raw}'"))),
    }
}

/// Exclusive upper bound of a stored money amount (`NUMERIC(12, 2)`).
pub const AMOUNT_LIMIT: i64 = 10_000_000_000;

/// Rejects amounts that would not fit their column once rounded to cents.
pub fn check_amount(field: &str, amount: &BigDecimal) -> Result<(), DomainError> {
    let limit = BigDecimal::from(AMOUNT_LIMIT);
    if *amount >= limit || amount.round(2) >= limit {
        return Err(DomainError::Validation(format!(
            "{field} must be less than {AMOUNT_LIMIT}"
        )));
    }
    Ok(())
}

/// Length limits count characters, as `VARCHAR(n)` does.
pub fn check_len(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Parses a value that may be a JSON-encoded string (as sent through `FormData`).
pub fn json_from_value(value: Value) -> Result<Value, DomainError> {
    match value {
        Value::String(s) => serde_json::from_str(&s)
            .map_err(|_| DomainError::validation("Invalid JSON data in request")),
        other => Ok(other),
    }
}
