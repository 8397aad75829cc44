//! Scripted datafeed used by controller and poller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{BaseDatafeed, DatafeedError};
use crate::kline::{Channel, FetchMode, KlinePoint, KlineSeries};

pub type Reply = Result<KlineSeries, DatafeedError>;

/// Replays queued replies per channel; the last reply repeats forever.
#[derive(Default)]
pub struct ScriptedDatafeed {
    replies: Mutex<HashMap<Channel, VecDeque<Reply>>>,
    calls: AtomicUsize,
    modes: Mutex<Vec<(Channel, FetchMode)>>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl ScriptedDatafeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call until the gate is notified
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push(&self, channel: Channel, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn modes(&self) -> Vec<(Channel, FetchMode)> {
        self.modes.lock().unwrap().clone()
    }

    /// Notified whenever a call has started
    pub fn entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }

    fn next(&self, channel: Channel) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.entry(channel).or_default();
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Ok(KlineSeries::empty()))
        } else {
            queue.front().cloned().unwrap_or(Ok(KlineSeries::empty()))
        }
    }
}

#[async_trait]
impl BaseDatafeed for ScriptedDatafeed {
    async fn fetch_kline(
        &self,
        _asset_id: u64,
        channel: Channel,
        mode: FetchMode,
    ) -> Result<KlineSeries, DatafeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push((channel, mode));
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.next(channel)
    }
}

/// Series of points with the given timestamps
pub fn series(timestamps: &[i64]) -> KlineSeries {
    KlineSeries::new(
        timestamps
            .iter()
            .map(|&ts| KlinePoint::new(ts, 10.0, 12.0, 9.0, 11.0, 100.0))
            .collect(),
    )
}
