//! Structured failures of the asset data API.

use std::fmt;

use thiserror::Error;

/// Why the backend has no data to hand out yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// A prime request was accepted and computation started
    ProcessingStarted,
    /// A previous prime request is still being processed
    AlreadyProcessing,
    /// Nobody primed this channel yet
    NeverRequested,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::ProcessingStarted => write!(f, "processing started"),
            NotReadyReason::AlreadyProcessing => write!(f, "already processing"),
            NotReadyReason::NeverRequested => write!(f, "no request made yet"),
        }
    }
}

/// Errors returned by a [`BaseDatafeed`](super::BaseDatafeed).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatafeedError {
    #[error("data not ready: {0}")]
    NotReady(NotReadyReason),

    #[error("{0}")]
    Insufficient(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("查詢K線數據失敗：沒有正確配置數據服務")]
    NotConfigured,
}

impl DatafeedError {
    /// Whether the condition is expected to clear on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, DatafeedError::NotReady(_))
    }
}

/// Known diagnostic phrases of the backend, matched by substring.
const PROCESSING_STARTED: &str = "開始處理資產資料";
const ALREADY_PROCESSING: &str = "資產資料已經在處理中";
const NEVER_REQUESTED: &str = "沒有請求過資產資料";
const NO_PRICE_CHART: &str = "無此資產的價格圖";
const INSUFFICIENT_DATA: &str = "數據不足";

/// Map a diagnostic message from the backend onto an error kind.
///
/// Returns `None` when the message does not describe a known non-data state.
pub fn classify_message(message: &str) -> Option<DatafeedError> {
    if message.contains(PROCESSING_STARTED) {
        Some(DatafeedError::NotReady(NotReadyReason::ProcessingStarted))
    } else if message.contains(ALREADY_PROCESSING) {
        Some(DatafeedError::NotReady(NotReadyReason::AlreadyProcessing))
    } else if message.contains(NEVER_REQUESTED) {
        Some(DatafeedError::NotReady(NotReadyReason::NeverRequested))
    } else if message.contains(NO_PRICE_CHART) || message.contains(INSUFFICIENT_DATA) {
        Some(DatafeedError::Insufficient(message.to_string()))
    } else {
        None
    }
}

/// Turn a non-2xx response body into an error.
///
/// Bodies are usually a JSON encoded string; plain text is accepted too.
pub fn error_from_body(status: u16, body: &str) -> DatafeedError {
    let message = decode_message(body);
    classify_message(&message).unwrap_or(DatafeedError::Server { status, message })
}

/// Strip the JSON string encoding the backend puts around messages
pub fn decode_message(body: &str) -> String {
    match serde_json::from_str::<String>(body) {
        Ok(text) => text,
        Err(_) => body.trim().to_string(),
    }
}
