//! Base constants and utility functions for the chart module.

use crate::kline::Channel;

/// Indicator attached to every freshly created chart
pub const DEFAULT_INDICATOR: &str = "VOL";

/// Placeholder shown where a statistic cannot be computed
pub const INSUFFICIENT_TEXT: &str = "數據不足";

/// Element id of the channel's loading indicator
pub fn loader_id(channel: Channel) -> String {
    format!("{}Loader", channel.value())
}

/// Element id of the channel's error text slot
pub fn error_text_id(channel: Channel) -> String {
    format!("{}ErrorText", channel.value())
}

/// Element id of the channel's chart container
pub fn chart_container_id(channel: Channel) -> String {
    format!("{}KlineChart", channel.value())
}

/// Format price with appropriate precision
pub fn format_price(price: f64, decimals: usize) -> String {
    format!("{:.prec$}", price, prec = decimals)
}

/// Format volume with appropriate units (K, M, B)
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{:.2}", volume)
    }
}
