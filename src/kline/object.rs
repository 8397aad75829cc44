//! Data structures exchanged with the asset backend.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::constant::Channel;

/// One OHLCV bucket of a k-line chart.
///
/// `timestamp` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KlinePoint {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl KlinePoint {
    /// Create a new KlinePoint
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bucket start as a UTC datetime
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// Time-ordered window of k-line points returned for one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KlineSeries {
    points: Vec<KlinePoint>,
    /// Channel echoed back by the server, if any
    pub channel: Option<Channel>,
    /// Newest timestamp the server claims to hold, if any
    pub server_last_timestamp: Option<i64>,
}

impl KlineSeries {
    /// Build a series, sorting points ascending by timestamp
    pub fn new(mut points: Vec<KlinePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self {
            points,
            channel: None,
            server_last_timestamp: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[KlinePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the newest point
    pub fn last_timestamp(&self) -> Option<i64> {
        self.points.last().map(|p| p.timestamp)
    }
}

/// Number or decimal string, as the backend serializes prices either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Number(f64),
    Text(String),
}

impl WireValue {
    /// Parse as a float
    pub fn as_f64(&self) -> Result<f64, String> {
        match self {
            WireValue::Number(n) => Ok(*n),
            WireValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number {:?}: {}", s, e)),
        }
    }

    /// Parse as epoch milliseconds; strings are RFC 3339 datetimes or digits
    pub fn as_timestamp_millis(&self) -> Result<i64, String> {
        match self {
            WireValue::Number(n) => Ok(*n as i64),
            WireValue::Text(s) => {
                let s = s.trim();
                if let Ok(ms) = s.parse::<i64>() {
                    return Ok(ms);
                }
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
                    .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
            }
        }
    }
}

/// A k-line point as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKlinePoint {
    pub timestamp: WireValue,
    pub open: WireValue,
    pub high: WireValue,
    pub low: WireValue,
    pub close: WireValue,
    pub volume: WireValue,
}

impl RawKlinePoint {
    /// Convert to a KlinePoint; volume is rounded up to a whole unit
    pub fn into_point(self) -> Result<KlinePoint, String> {
        Ok(KlinePoint {
            timestamp: self.timestamp.as_timestamp_millis()?,
            open: self.open.as_f64()?,
            high: self.high.as_f64()?,
            low: self.low.as_f64()?,
            close: self.close.as_f64()?,
            volume: self.volume.as_f64()?.ceil(),
        })
    }
}

/// Body of a successful k-line query.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineResponse {
    #[serde(default)]
    pub data: Vec<RawKlinePoint>,
    #[serde(rename = "type", default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub last_timestamp: Option<WireValue>,
}

impl KlineResponse {
    /// Decode into a sorted series
    pub fn into_series(self) -> Result<KlineSeries, String> {
        let points = self
            .data
            .into_iter()
            .map(RawKlinePoint::into_point)
            .collect::<Result<Vec<_>, _>>()?;

        let mut series = KlineSeries::new(points);
        series.channel = self.channel.and_then(|c| c.parse().ok());
        series.server_last_timestamp = self
            .last_timestamp
            .and_then(|t| t.as_timestamp_millis().ok());
        Ok(series)
    }
}

/// Asset name and price statistics as returned by the asset info endpoint.
///
/// `statistics` is ordered `[year, month, week, day, today]`; entries the
/// backend cannot compute are the text "數據不足".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub asset_name: String,
    #[serde(default)]
    pub statistics: Vec<WireValue>,
}
