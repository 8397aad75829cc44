//! Chart handle bound to one container.

use crate::kline::KlinePoint;

use super::base::format_price;
use super::manager::KlineManager;

/// Rendering surface of one channel's k-line chart.
///
/// Mirrors the surface of a browser charting library: data is replaced
/// wholesale with [`apply_new_data`](Self::apply_new_data) or patched one
/// point at a time with [`update_data`](Self::update_data).
#[derive(Debug, Clone)]
pub struct KlineChart {
    container_id: String,
    manager: KlineManager,
    indicators: Vec<String>,
    /// Number of full data replacements
    apply_count: usize,
}

impl KlineChart {
    /// Create an empty chart inside a container
    pub fn init(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            manager: KlineManager::new(),
            indicators: Vec::new(),
            apply_count: 0,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Replace all chart data
    pub fn apply_new_data(&mut self, points: Vec<KlinePoint>) {
        self.manager.clear_all();
        self.manager.update_history(points);
        self.apply_count += 1;
    }

    /// Insert or replace a single point
    pub fn update_data(&mut self, point: KlinePoint) {
        self.manager.update_point(point);
    }

    /// Attach an indicator pane; attaching twice is a no-op
    pub fn create_indicator(&mut self, name: &str) {
        if !self.indicators.iter().any(|n| n == name) {
            self.indicators.push(name.to_string());
        }
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn apply_count(&self) -> usize {
        self.apply_count
    }

    pub fn points(&self) -> &[KlinePoint] {
        self.manager.get_all_points()
    }

    pub fn manager(&self) -> &KlineManager {
        &self.manager
    }

    /// One-line text description of the chart contents
    pub fn describe(&self) -> String {
        match self.manager.last_point() {
            Some(last) => {
                let (low, high) = self.manager.get_price_range(None, None);
                format!(
                    "{} points, range {} - {}, last close {}",
                    self.manager.get_count(),
                    format_price(low, 3),
                    format_price(high, 3),
                    format_price(last.close, 3)
                )
            }
            None => "no data".to_string(),
        }
    }
}
