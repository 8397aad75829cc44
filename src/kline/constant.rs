//! Constant enums shared by the chart client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Independent polling/rendering stream of an asset chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Recent price series (即時)
    Current,
    /// Long-range historical series (歷史)
    History,
}

impl Channel {
    /// Every channel, in display order
    pub const ALL: [Channel; 2] = [Channel::Current, Channel::History];

    /// Get channel value string as used by the REST API
    pub fn value(&self) -> &'static str {
        match self {
            Channel::Current => "current",
            Channel::History => "history",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Current => "即時",
            Channel::History => "歷史",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Channel::Current),
            "history" => Ok(Channel::History),
            other => Err(format!("錯誤的查詢類型: {}", other)),
        }
    }
}

/// How a refresh talks to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FetchMode {
    /// Read already materialized data
    #[default]
    Query,
    /// Ask the backend to start computing data that is not there yet
    Prime,
}

impl FetchMode {
    pub fn value(&self) -> &'static str {
        match self {
            FetchMode::Query => "query",
            FetchMode::Prime => "prime",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
