//! K-line data manager for the chart module.
//!
//! Keeps points ordered by timestamp with an index lookup, and answers
//! range queries for price and volume axes.

use std::collections::HashMap;

use crate::kline::KlinePoint;

/// Manages k-line points with timestamp-based indexing
#[derive(Debug, Clone, Default)]
pub struct KlineManager {
    /// Map from timestamp to index into `ordered_points`
    timestamp_index_map: HashMap<i64, usize>,
    /// Points sorted ascending by timestamp
    ordered_points: Vec<KlinePoint>,
}

impl KlineManager {
    /// Create a new KlineManager
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a list of points, replacing any with the same timestamp
    pub fn update_history(&mut self, history: Vec<KlinePoint>) {
        let mut merged: HashMap<i64, KlinePoint> = self
            .ordered_points
            .drain(..)
            .map(|p| (p.timestamp, p))
            .collect();
        for point in history {
            merged.insert(point.timestamp, point);
        }

        let mut sorted: Vec<_> = merged.into_values().collect();
        sorted.sort_by_key(|p| p.timestamp);
        self.ordered_points = sorted;
        self.rebuild_index();
    }

    /// Update with a single point
    pub fn update_point(&mut self, point: KlinePoint) {
        if let Some(&ix) = self.timestamp_index_map.get(&point.timestamp) {
            self.ordered_points[ix] = point;
            return;
        }

        let is_newest = self
            .ordered_points
            .last()
            .map_or(true, |last| last.timestamp < point.timestamp);

        if is_newest {
            self.timestamp_index_map
                .insert(point.timestamp, self.ordered_points.len());
            self.ordered_points.push(point);
        } else {
            self.update_history(vec![point]);
        }
    }

    fn rebuild_index(&mut self) {
        self.timestamp_index_map = self
            .ordered_points
            .iter()
            .enumerate()
            .map(|(ix, p)| (p.timestamp, ix))
            .collect();
    }

    /// Get total number of points
    pub fn get_count(&self) -> usize {
        self.ordered_points.len()
    }

    /// Get index for a timestamp
    pub fn get_index(&self, timestamp: i64) -> Option<usize> {
        self.timestamp_index_map.get(&timestamp).copied()
    }

    /// Get point for an index
    pub fn get_point(&self, ix: usize) -> Option<&KlinePoint> {
        self.ordered_points.get(ix)
    }

    /// Get all points
    pub fn get_all_points(&self) -> &[KlinePoint] {
        &self.ordered_points
    }

    /// Newest point
    pub fn last_point(&self) -> Option<&KlinePoint> {
        self.ordered_points.last()
    }

    fn clamp_range(&self, min_ix: Option<usize>, max_ix: Option<usize>) -> Option<&[KlinePoint]> {
        let last = self.ordered_points.len().checked_sub(1)?;
        let min_ix = min_ix.unwrap_or(0);
        let max_ix = max_ix.unwrap_or(last).min(last);
        if min_ix > max_ix {
            return None;
        }
        Some(&self.ordered_points[min_ix..=max_ix])
    }

    /// Get price range for given index range
    pub fn get_price_range(&self, min_ix: Option<usize>, max_ix: Option<usize>) -> (f64, f64) {
        match self.clamp_range(min_ix, max_ix) {
            Some(points) => points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
                (lo.min(p.low), hi.max(p.high))
            }),
            None => (0.0, 1.0),
        }
    }

    /// Get volume range for given index range
    pub fn get_volume_range(&self, min_ix: Option<usize>, max_ix: Option<usize>) -> (f64, f64) {
        match self.clamp_range(min_ix, max_ix) {
            Some(points) => (0.0, points.iter().fold(0.0, |hi, p| hi.max(p.volume))),
            None => (0.0, 1.0),
        }
    }

    /// Clear all data
    pub fn clear_all(&mut self) {
        self.timestamp_index_map.clear();
        self.ordered_points.clear();
    }
}
