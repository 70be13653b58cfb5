// src/models/submission.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::AppError;

const UNKNOWN: &str = "Unknown";

const NAME_KEYS: &[&str] = &["name", "studentName", "student"];
const GROUP_KEYS: &[&str] = &["group", "groupName", "className", "class"];
const SCORE_KEYS: &[&str] = &["score"];
const PERCENTAGE_KEYS: &[&str] = &["percentage", "percent"];
const TIME_KEYS: &[&str] = &["time", "timeSpent", "elapsed", "elapsedSeconds"];
const LEAVES_KEYS: &[&str] = &["leaves", "pageLeaves", "tabSwitches"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "submittedAt"];

/// A submission after normalization: every field has a concrete value.
///
/// Built from an untrusted object whose field names vary between client
/// versions. Normalizing never fails; unusable values fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub name: String,
    pub group: String,
    pub score: i64,
    pub percentage: Option<f64>,
    pub time_secs: u64,
    pub leaves: u64,
    pub submitted_at: DateTime<Utc>,
    /// `qN` -> selected letter. `None` when the client sent no answer map.
    pub answers: Option<BTreeMap<String, String>>,
}

impl Submission {
    pub fn from_object(object: &Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            name: text_field(object, NAME_KEYS),
            group: text_field(object, GROUP_KEYS),
            score: score_field(object),
            percentage: first(object, PERCENTAGE_KEYS).and_then(lenient_number),
            time_secs: counter_field(object, TIME_KEYS),
            leaves: counter_field(object, LEAVES_KEYS),
            submitted_at: first(object, TIMESTAMP_KEYS)
                .and_then(parse_timestamp)
                .unwrap_or(now),
            answers: object.get("answers").and_then(Value::as_object).map(|map| {
                map.iter()
                    .filter_map(|(question, answer)| {
                        answer.as_str().map(|a| (question.clone(), a.to_string()))
                    })
                    .collect()
            }),
        }
    }
}

/// Decodes a raw request body into the submission object.
///
/// A body that decodes to a JSON string is decoded once more, since some
/// clients send the payload stringified.
pub fn decode_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| AppError::MalformedInput(format!("body is not UTF-8: {}", e)))?;
    if text.trim().is_empty() {
        return Err(AppError::MissingInput);
    }

    let mut value: Value = serde_json::from_str(text)?;
    if let Value::String(inner) = &value {
        if inner.trim().is_empty() {
            return Err(AppError::MissingInput);
        }
        value = serde_json::from_str(inner)?;
    }

    match value {
        Value::Object(object) => Ok(object),
        Value::Null => Err(AppError::MissingInput),
        other => Err(AppError::MalformedInput(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// First present, non-null value among `keys`.
fn first<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    first(object, keys)
        .and_then(|value| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Scores are whole numbers; a fractional value falls back to 0 rather than being rounded.
fn score_field(object: &Map<String, Value>) -> i64 {
    let Some(score) = first(object, SCORE_KEYS).and_then(lenient_number) else {
        return 0;
    };
    if score.fract() != 0.0 {
        tracing::warn!("Ignoring non-integer score {}", score);
        return 0;
    }
    score as i64
}

fn counter_field(object: &Map<String, Value>, keys: &[&str]) -> u64 {
    first(object, keys)
        .and_then(lenient_number)
        .map(|n| if n <= 0.0 { 0 } else { n.trunc() as u64 })
        .unwrap_or(0)
}

/// Accepts JSON numbers and numeric strings; rejects NaN and infinities.
fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Epoch milliseconds (number or numeric string) or an ISO 8601 string.
///
/// ISO values without an offset, including date-only ones, are taken as UTC.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_naive(s))
                .or_else(|| s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis))
        }
        Value::Number(_) => lenient_number(value)
            .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64)),
        _ => None,
    }
}

fn parse_naive(s: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
