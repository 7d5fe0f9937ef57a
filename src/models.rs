//! Core data models for the query orchestrator

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

//
// ================= Parsed Query =================
//

/// Structured intent extracted from a free-text query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Ticker-like tokens, deduplicated and sorted
    pub tickers: BTreeSet<String>,
    pub keywords: Vec<String>,
    pub intent: String,
    pub target_info: Vec<String>,
}

impl ParsedQuery {
    pub fn primary_ticker(&self) -> Option<&str> {
        self.tickers.iter().next().map(String::as_str)
    }

    /// Keywords followed by tickers, the terms used for retrieval
    pub fn retrieval_terms(&self) -> Vec<String> {
        self.keywords
            .iter()
            .chain(self.tickers.iter())
            .cloned()
            .collect()
    }
}

//
// ================= Output Format =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Voice,
}

impl OutputFormat {
    /// Only the exact string "voice" selects voice output.
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some("voice") => OutputFormat::Voice,
            _ => OutputFormat::Text,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Text => "text",
            OutputFormat::Voice => "voice",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Service Results =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request could not be built (e.g. bad file mime type)
    InvalidRequest,
    Network,
    HttpStatus,
    Decode,
    UpstreamLogic,
}

/// Error record produced for a failed downstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub error: String,
    pub status_code: u16,
    pub kind: FailureKind,
}

impl ServiceError {
    pub const DEFAULT_STATUS: u16 = 500;

    pub fn new(kind: FailureKind, error: impl Into<String>, status_code: u16) -> Self {
        Self {
            error: error.into(),
            status_code,
            kind,
        }
    }

    pub fn upstream(error: impl Into<String>) -> Self {
        Self::new(FailureKind::UpstreamLogic, error, Self::DEFAULT_STATUS)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.error, self.status_code)
    }
}

/// Successful downstream payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// Body that was expected to be JSON but failed to decode
    Text(String),
    Bytes(Vec<u8>),
}

/// Exactly one outcome per downstream call
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResult {
    Success(Payload),
    Failure(ServiceError),
}

impl ServiceResult {
    pub fn json(value: Value) -> Self {
        ServiceResult::Success(Payload::Json(value))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ServiceResult::Success(Payload::Bytes(bytes.into()))
    }

    pub fn failure(kind: FailureKind, error: impl Into<String>, status_code: u16) -> Self {
        ServiceResult::Failure(ServiceError::new(kind, error, status_code))
    }

    /// Interpret the result as a JSON object.
    ///
    /// A structured body that carries a truthy `error` field counts as a
    /// failure, as do raw text and byte payloads.
    pub fn into_object(self) -> std::result::Result<Map<String, Value>, ServiceError> {
        match self {
            ServiceResult::Failure(err) => Err(err),
            ServiceResult::Success(Payload::Json(Value::Object(map))) => {
                match map.get("error").filter(|v| is_truthy(v)) {
                    Some(error) => {
                        let status_code = map
                            .get("status_code")
                            .and_then(Value::as_u64)
                            .and_then(|code| u16::try_from(code).ok())
                            .unwrap_or(ServiceError::DEFAULT_STATUS);
                        Err(ServiceError::new(
                            FailureKind::UpstreamLogic,
                            value_to_text(error),
                            status_code,
                        ))
                    }
                    None => Ok(map),
                }
            }
            ServiceResult::Success(Payload::Json(other)) => Err(ServiceError::upstream(format!(
                "Expected a JSON object, got {}",
                json_type_name(&other)
            ))),
            ServiceResult::Success(Payload::Text(text)) => Err(ServiceError::new(
                FailureKind::Decode,
                format!("Unstructured response body ({} chars)", text.chars().count()),
                ServiceError::DEFAULT_STATUS,
            )),
            ServiceResult::Success(Payload::Bytes(bytes)) => Err(ServiceError::upstream(format!(
                "Expected JSON, got {} raw bytes",
                bytes.len()
            ))),
        }
    }
}

/// Python-style truthiness for JSON values
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a JSON value as plain text (strings unquoted)
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//
// ================= Aggregation =================
//

/// Market data per successfully fetched ticker
pub type MarketDataMap = BTreeMap<String, Value>;

/// Body sent to the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub market_info: Option<Value>,
    pub news_articles: Vec<String>,
    pub company_filings: Vec<String>,
    pub company_ticker: Option<String>,
}

//
// ================= Final Response =================
//

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
pub const ANALYSIS_FAILURE_MESSAGE: &str = "Failed to get analysis";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextResponse {
    pub text_response: String,
    pub analysis_details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceResponse {
    pub text_response: String,
    #[serde(serialize_with = "serialize_audio")]
    pub voice_response_bytes: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub details: String,
}

/// Result of one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FinalResponse {
    Text(TextResponse),
    Voice(VoiceResponse),
    Failed(AnalysisFailure),
}

impl FinalResponse {
    pub fn analysis_failed(details: impl Into<String>) -> Self {
        FinalResponse::Failed(AnalysisFailure {
            error: ANALYSIS_FAILURE_MESSAGE.to_string(),
            details: details.into(),
        })
    }

    pub fn text_response(&self) -> Option<&str> {
        match self {
            FinalResponse::Text(r) => Some(&r.text_response),
            FinalResponse::Voice(r) => Some(&r.text_response),
            FinalResponse::Failed(_) => None,
        }
    }

    /// Error message carried by the response, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            FinalResponse::Text(_) => None,
            FinalResponse::Voice(r) => r.error.as_deref(),
            FinalResponse::Failed(r) => Some(&r.error),
        }
    }
}

fn serialize_audio<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    match bytes {
        Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}
