//! Per-channel display elements: loader, error slot and chart container.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::kline::{Channel, KlinePoint};

use super::base::{chart_container_id, error_text_id, loader_id, DEFAULT_INDICATOR};
use super::widget::KlineChart;

/// Display surface the refresh controller drives.
pub trait ChartBoard: Send + Sync {
    /// Show or hide the channel's loading indicator
    fn toggle_loader(&self, channel: Channel, visible: bool);

    /// Put an error message into the channel's error slot and show it
    fn show_error(&self, channel: Channel, message: &str);

    /// Hide the channel's error slot
    fn hide_error(&self, channel: Channel);

    /// Replace the channel's chart contents with `points`
    fn render(&self, channel: Channel, points: &[KlinePoint]);

    /// Drop the channel's chart handle; the next render creates a new one
    fn clear(&self, channel: Channel);
}

/// Snapshot of one channel's display elements.
#[derive(Debug, Clone, Default)]
pub struct ChannelPanel {
    pub loader_visible: bool,
    pub error_text: Option<String>,
    pub chart: Option<KlineChart>,
    /// How many chart handles were created for this channel
    pub charts_created: usize,
}

impl ChannelPanel {
    pub fn error_visible(&self) -> bool {
        self.error_text.is_some()
    }

    /// Number of full data replacements on the current chart
    pub fn render_count(&self) -> usize {
        self.chart.as_ref().map_or(0, |c| c.apply_count())
    }
}

/// In-memory board keeping every channel's display state.
pub struct MemoryBoard {
    panels: Mutex<HashMap<Channel, ChannelPanel>>,
    indicator: String,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::with_indicator(DEFAULT_INDICATOR)
    }

    /// Create a board whose charts get `indicator` attached on creation
    pub fn with_indicator(indicator: impl Into<String>) -> Self {
        Self {
            panels: Mutex::new(HashMap::new()),
            indicator: indicator.into(),
        }
    }

    /// Copy of a channel's current display state
    pub fn panel(&self, channel: Channel) -> ChannelPanel {
        self.lock().get(&channel).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Channel, ChannelPanel>> {
        self.panels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_panel<F: FnOnce(&mut ChannelPanel)>(&self, channel: Channel, f: F) {
        f(self.lock().entry(channel).or_default());
    }
}

impl Default for MemoryBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBoard for MemoryBoard {
    fn toggle_loader(&self, channel: Channel, visible: bool) {
        debug!("#{} display={}", loader_id(channel), if visible { "flex" } else { "none" });
        self.with_panel(channel, |panel| panel.loader_visible = visible);
    }

    fn show_error(&self, channel: Channel, message: &str) {
        debug!("#{} text={}", error_text_id(channel), message);
        self.with_panel(channel, |panel| panel.error_text = Some(message.to_string()));
    }

    fn hide_error(&self, channel: Channel) {
        self.with_panel(channel, |panel| panel.error_text = None);
    }

    fn render(&self, channel: Channel, points: &[KlinePoint]) {
        let indicator = self.indicator.as_str();
        self.with_panel(channel, |panel| {
            if panel.chart.is_none() {
                let mut chart = KlineChart::init(chart_container_id(channel));
                if !indicator.is_empty() {
                    chart.create_indicator(indicator);
                }
                panel.chart = Some(chart);
                panel.charts_created += 1;
            }
            if let Some(chart) = panel.chart.as_mut() {
                chart.apply_new_data(points.to_vec());
                debug!("#{} {}", chart.container_id(), chart.describe());
            }
        });
    }

    fn clear(&self, channel: Channel) {
        self.with_panel(channel, |panel| panel.chart = None);
    }
}
