//! Message normalization from JSONL lines to the canonical NormalizedRecord

use serde::Serialize;
use serde_json::{Map, Value};

/// One decoded line of the live data file; keys and value types are not checked yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub message: Option<String>,
    pub author: Option<String>,
    pub timestamp: Option<String>,
    pub category: Option<String>,
    pub sentiment: f64,
    pub keyword_mentioned: Option<String>,
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    NotAnObject(&'static str),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err)
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "JSON decode error: {}", e),
            DecodeError::NotAnObject(kind) => write!(f, "expected a JSON object, got {}", kind),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    NonNumericSentiment(String),
    NonFiniteSentiment(String),
    IncompatibleSentiment(&'static str),
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::NonNumericSentiment(s) => {
                write!(f, "could not convert sentiment to float: '{}'", s)
            }
            NormalizeError::NonFiniteSentiment(s) => write!(f, "sentiment is not finite: '{}'", s),
            NormalizeError::IncompatibleSentiment(kind) => {
                write!(f, "sentiment must be a number or numeric string, got {}", kind)
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

impl RawRecord {
    /// Parse a RawRecord from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DecodeError::NotAnObject(value_kind(&other))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl NormalizedRecord {
    /// Single-line JSON form used in log output
    pub fn to_log_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Row in CSV column order; absent fields become empty cells
    pub fn csv_row(&self) -> [String; 6] {
        [
            self.message.clone().unwrap_or_default(),
            self.author.clone().unwrap_or_default(),
            self.timestamp.clone().unwrap_or_default(),
            self.category.clone().unwrap_or_default(),
            format!("{:?}", self.sentiment),
            self.keyword_mentioned.clone().unwrap_or_default(),
        ]
    }
}

/// Normalize a raw record.
///
/// A missing `sentiment` key counts as 0.0. Any sentiment that cannot be coerced
/// to a finite float drops the whole record.
pub fn normalize(raw: &RawRecord) -> Result<NormalizedRecord, NormalizeError> {
    let sentiment = match raw.get("sentiment") {
        None => Ok(0.0),
        Some(value) => coerce_sentiment(value),
    };

    match sentiment {
        Ok(sentiment) => {
            let record = NormalizedRecord {
                message: text_field(raw, "message"),
                author: text_field(raw, "author"),
                timestamp: text_field(raw, "timestamp"),
                category: text_field(raw, "category"),
                sentiment,
                keyword_mentioned: text_field(raw, "keyword_mentioned"),
            };
            log::info!("Processed message: {}", record.to_log_json());
            Ok(record)
        }
        Err(e) => {
            log::error!("Error processing message: {}", e);
            Err(e)
        }
    }
}

fn coerce_sentiment(value: &Value) -> Result<f64, NormalizeError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| NormalizeError::NonNumericSentiment(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| NormalizeError::NonNumericSentiment(s.clone()))?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        other => return Err(NormalizeError::IncompatibleSentiment(value_kind(other))),
    };

    if !parsed.is_finite() {
        return Err(NormalizeError::NonFiniteSentiment(value.to_string()));
    }
    Ok(parsed)
}

// Non-string scalars are kept in their JSON spelling rather than rejected.
fn text_field(raw: &RawRecord, key: &str) -> Option<String> {
    match raw.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
