//! Chart refresh controller.
//!
//! Fetches the latest k-line window of a channel, decides whether it carries
//! new information and either renders it or reports why nothing was drawn.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::chart::ChartBoard;
use crate::datafeed::{BaseDatafeed, DatafeedError};
use crate::kline::{Channel, FetchMode, KlineSeries};

/// Result of one `refresh` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New points were rendered
    Updated,
    /// Valid response without newer points
    NoChange,
    /// Backend is still preparing the data
    Pending,
    /// Backend has too little data to draw a chart
    Insufficient,
    /// Another refresh of the channel is in flight
    Busy,
    /// Any other failure, with the message shown to the user
    Error(String),
}

impl RefreshOutcome {
    /// Whether a warm-up poller should keep trying.
    ///
    /// Only rendered data and a lack of data settle a channel; errors are
    /// retried like pending answers.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RefreshOutcome::Updated | RefreshOutcome::Insufficient)
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshOutcome::Updated => write!(f, "updated"),
            RefreshOutcome::NoChange => write!(f, "no change"),
            RefreshOutcome::Pending => write!(f, "pending"),
            RefreshOutcome::Insufficient => write!(f, "insufficient data"),
            RefreshOutcome::Busy => write!(f, "busy"),
            RefreshOutcome::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Lifecycle phase of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    #[default]
    Idle,
    Fetching,
    Rendered,
    Errored,
}

/// Mutable state of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub is_fetching: bool,
    /// Channel has settled: data rendered, or the backend reported too little data
    pub is_updated: bool,
    /// Backend reported too little data and no chart was rendered since
    pub insufficient: bool,
    /// Newest rendered timestamp in epoch milliseconds
    pub last_timestamp: Option<i64>,
    pub phase: ChannelPhase,
    /// Bumped by `reset`; responses to older requests are dropped
    pub generation: u64,
}

/// Releases the in-flight flag of a channel on every exit path.
struct FetchGuard<'a> {
    state: &'a Mutex<ChannelState>,
    generation: u64,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.is_fetching = false;
        if state.phase == ChannelPhase::Fetching {
            state.phase = ChannelPhase::Idle;
        }
    }
}

fn lock(state: &Mutex<ChannelState>) -> MutexGuard<'_, ChannelState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives fetch-and-render of every channel of one asset.
pub struct ChartRefreshController {
    asset_id: u64,
    datafeed: Arc<dyn BaseDatafeed>,
    board: Arc<dyn ChartBoard>,
    states: HashMap<Channel, Mutex<ChannelState>>,
}

impl ChartRefreshController {
    /// Create a controller with idle state for every channel
    pub fn new(asset_id: u64, datafeed: Arc<dyn BaseDatafeed>, board: Arc<dyn ChartBoard>) -> Self {
        let states = Channel::ALL
            .iter()
            .map(|&channel| (channel, Mutex::new(ChannelState::default())))
            .collect();

        Self {
            asset_id,
            datafeed,
            board,
            states,
        }
    }

    pub fn asset_id(&self) -> u64 {
        self.asset_id
    }

    pub fn board(&self) -> &Arc<dyn ChartBoard> {
        &self.board
    }

    fn slot(&self, channel: Channel) -> &Mutex<ChannelState> {
        // Every channel is inserted in `new`.
        &self.states[&channel]
    }

    /// Copy of a channel's state
    pub fn state(&self, channel: Channel) -> ChannelState {
        lock(self.slot(channel)).clone()
    }

    /// Forget everything about a channel and drop its chart.
    ///
    /// A request already in flight keeps the channel busy until it returns,
    /// and its response is discarded.
    pub fn reset(&self, channel: Channel) {
        let mut state = lock(self.slot(channel));
        let fetching = state.is_fetching;
        *state = ChannelState {
            is_fetching: fetching,
            phase: if fetching { ChannelPhase::Fetching } else { ChannelPhase::Idle },
            generation: state.generation.wrapping_add(1),
            ..ChannelState::default()
        };
        self.board.clear(channel);
        self.board.hide_error(channel);
    }

    fn try_begin(&self, channel: Channel) -> Option<FetchGuard<'_>> {
        let slot = self.slot(channel);
        let mut state = lock(slot);
        if state.is_fetching {
            return None;
        }
        state.is_fetching = true;
        state.phase = ChannelPhase::Fetching;
        Some(FetchGuard {
            state: slot,
            generation: state.generation,
        })
    }

    /// Lock a channel's state unless it was reset after `generation` was taken
    fn current(&self, channel: Channel, generation: u64) -> Option<MutexGuard<'_, ChannelState>> {
        let state = lock(self.slot(channel));
        if state.generation == generation {
            Some(state)
        } else {
            debug!("{} response dropped, channel was reset", channel);
            None
        }
    }

    /// Fetch and, when the response holds newer points, render a channel
    pub async fn refresh(&self, channel: Channel, mode: FetchMode) -> RefreshOutcome {
        let Some(guard) = self.try_begin(channel) else {
            debug!("{} refresh skipped, request in flight", channel);
            return RefreshOutcome::Busy;
        };

        self.board.toggle_loader(channel, mode == FetchMode::Query);

        let result = self.datafeed.fetch_kline(self.asset_id, channel, mode).await;
        match result {
            Ok(series) => self.on_series(channel, guard.generation, series),
            Err(err) => self.on_error(channel, guard.generation, err),
        }
    }

    // The state lock is held across board updates so a concurrent `reset`
    // either runs before (and the response is dropped) or after them.
    fn on_series(&self, channel: Channel, generation: u64, series: KlineSeries) -> RefreshOutcome {
        let Some(mut state) = self.current(channel, generation) else {
            return RefreshOutcome::NoChange;
        };

        let newest = match series.last_timestamp() {
            Some(ts) if state.last_timestamp.map_or(true, |last| ts > last) => ts,
            _ => {
                state.phase = ChannelPhase::Idle;
                self.board.toggle_loader(channel, true);
                debug!("資產{} {}圖表沒有新數據", self.asset_id, channel.display_name());
                return RefreshOutcome::NoChange;
            }
        };

        state.last_timestamp = Some(newest);
        state.is_updated = true;
        state.insufficient = false;
        state.phase = ChannelPhase::Rendered;

        self.board.render(channel, series.points());
        self.board.hide_error(channel);
        self.board.toggle_loader(channel, false);
        info!(
            "資產{} {}圖表已更新: {} points, last={}",
            self.asset_id,
            channel.display_name(),
            series.len(),
            newest
        );
        RefreshOutcome::Updated
    }

    fn on_error(&self, channel: Channel, generation: u64, err: DatafeedError) -> RefreshOutcome {
        let Some(mut state) = self.current(channel, generation) else {
            return RefreshOutcome::NoChange;
        };

        match err {
            DatafeedError::NotReady(reason) => {
                state.phase = ChannelPhase::Idle;
                self.board.hide_error(channel);
                self.board.toggle_loader(channel, true);
                debug!("資產{} {}圖表處理中: {}", self.asset_id, channel.display_name(), reason);
                RefreshOutcome::Pending
            }
            DatafeedError::Insufficient(message) => {
                state.is_updated = true;
                state.insufficient = true;
                state.phase = ChannelPhase::Idle;
                self.board.toggle_loader(channel, false);
                self.board.show_error(channel, &message);
                info!("資產{} {}圖表數據不足: {}", self.asset_id, channel.display_name(), message);
                RefreshOutcome::Insufficient
            }
            other => {
                let message = other.to_string();
                state.phase = ChannelPhase::Errored;
                self.board.toggle_loader(channel, false);
                self.board.show_error(channel, &message);
                warn!("資產{} {}圖表更新失敗: {}", self.asset_id, channel.display_name(), message);
                RefreshOutcome::Error(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::MemoryBoard;
    use crate::datafeed::testing::{series, ScriptedDatafeed};
    use crate::datafeed::NotReadyReason;
    use tokio::sync::Notify;

    fn setup(feed: ScriptedDatafeed) -> (Arc<ScriptedDatafeed>, Arc<MemoryBoard>, ChartRefreshController) {
        let feed = Arc::new(feed);
        let board = Arc::new(MemoryBoard::new());
        let controller = ChartRefreshController::new(7, feed.clone(), board.clone());
        (feed, board, controller)
    }

    #[tokio::test]
    async fn test_empty_series_is_no_change() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::Current, Ok(KlineSeries::empty()));

        let outcome = controller.refresh(Channel::Current, FetchMode::Query).await;

        assert_eq!(outcome, RefreshOutcome::NoChange);
        let panel = board.panel(Channel::Current);
        assert!(panel.loader_visible);
        assert!(panel.chart.is_none());
        assert_eq!(controller.state(Channel::Current).last_timestamp, None);
    }

    #[tokio::test]
    async fn test_same_point_twice() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::Current, Ok(series(&[1000])));

        let first = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(first, RefreshOutcome::Updated);
        assert_eq!(controller.state(Channel::Current).last_timestamp, Some(1000));

        let second = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(second, RefreshOutcome::NoChange);
        assert_eq!(controller.state(Channel::Current).last_timestamp, Some(1000));

        let panel = board.panel(Channel::Current);
        assert_eq!(panel.render_count(), 1);
        assert!(panel.loader_visible);
        assert_eq!(panel.chart.unwrap().points().len(), 1);
        assert_eq!(feed.calls(), 2);
    }

    #[tokio::test]
    async fn test_never_requested_is_pending() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(
            Channel::History,
            Err(DatafeedError::NotReady(NotReadyReason::NeverRequested)),
        );

        let outcome = controller.refresh(Channel::History, FetchMode::Query).await;

        assert_eq!(outcome, RefreshOutcome::Pending);
        let panel = board.panel(Channel::History);
        assert!(panel.loader_visible);
        assert!(!panel.error_visible());
        let state = controller.state(Channel::History);
        assert_eq!(state.phase, ChannelPhase::Idle);
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn test_unknown_failure_is_error() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(
            Channel::Current,
            Err(DatafeedError::Server {
                status: 400,
                message: "找不到資產".to_string(),
            }),
        );

        let outcome = controller.refresh(Channel::Current, FetchMode::Query).await;

        assert_eq!(outcome, RefreshOutcome::Error("找不到資產".to_string()));
        let panel = board.panel(Channel::Current);
        assert!(!panel.loader_visible);
        assert_eq!(panel.error_text.as_deref(), Some("找不到資產"));
        let state = controller.state(Channel::Current);
        assert_eq!(state.phase, ChannelPhase::Errored);
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn test_error_is_not_sticky() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::Current, Err(DatafeedError::Transport("timeout".to_string())));
        feed.push(Channel::Current, Ok(series(&[1000, 2000])));

        let first = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert!(matches!(first, RefreshOutcome::Error(_)));

        let second = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(second, RefreshOutcome::Updated);

        let panel = board.panel(Channel::Current);
        assert!(!panel.error_visible());
        assert_eq!(controller.state(Channel::Current).phase, ChannelPhase::Rendered);
    }

    #[tokio::test]
    async fn test_insufficient_marks_channel_only() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::History, Err(DatafeedError::Insufficient("無此資產的價格圖".to_string())));
        feed.push(Channel::Current, Ok(series(&[1000])));

        let history = controller.refresh(Channel::History, FetchMode::Query).await;
        let current = controller.refresh(Channel::Current, FetchMode::Query).await;

        assert_eq!(history, RefreshOutcome::Insufficient);
        assert_eq!(current, RefreshOutcome::Updated);
        let state = controller.state(Channel::History);
        assert!(state.is_updated);
        assert!(state.insufficient);
        assert!(!state.is_fetching);
        assert_eq!(state.last_timestamp, None);
        assert!(!controller.state(Channel::Current).insufficient);
        assert_eq!(
            board.panel(Channel::History).error_text.as_deref(),
            Some("無此資產的價格圖")
        );
    }

    #[tokio::test]
    async fn test_last_timestamp_never_decreases() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        for window in [&[1000, 2000][..], &[500][..], &[3000][..], &[2500, 2999][..], &[][..]] {
            feed.push(Channel::Current, Ok(series(window)));
        }

        let mut seen = Vec::new();
        for _ in 0..5 {
            controller.refresh(Channel::Current, FetchMode::Query).await;
            seen.push(controller.state(Channel::Current).last_timestamp.unwrap_or(0));
        }

        assert_eq!(seen, vec![2000, 2000, 3000, 3000, 3000]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(board.panel(Channel::Current).render_count(), 2);
    }

    #[tokio::test]
    async fn test_prime_hides_loader_until_pending() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(
            Channel::Current,
            Err(DatafeedError::NotReady(NotReadyReason::ProcessingStarted)),
        );

        let outcome = controller.refresh(Channel::Current, FetchMode::Prime).await;

        assert_eq!(outcome, RefreshOutcome::Pending);
        assert!(board.panel(Channel::Current).loader_visible);
        assert_eq!(feed.modes(), vec![(Channel::Current, FetchMode::Prime)]);
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_busy() {
        let gate = Arc::new(Notify::new());
        let (feed, _board, controller) = setup(ScriptedDatafeed::gated(gate.clone()));
        feed.push(Channel::Current, Ok(series(&[1000])));
        let controller = Arc::new(controller);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh(Channel::Current, FetchMode::Query).await })
        };
        feed.entered().notified().await;
        assert!(controller.state(Channel::Current).is_fetching);

        let second = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(second, RefreshOutcome::Busy);
        assert_eq!(feed.calls(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Updated);
        assert!(!controller.state(Channel::Current).is_fetching);
    }

    #[tokio::test]
    async fn test_channels_fetch_independently() {
        let gate = Arc::new(Notify::new());
        let (feed, _board, controller) = setup(ScriptedDatafeed::gated(gate.clone()));
        feed.push(Channel::Current, Ok(series(&[1000])));
        feed.push(Channel::History, Ok(series(&[9000])));
        let controller = Arc::new(controller);

        let current = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh(Channel::Current, FetchMode::Query).await })
        };
        feed.entered().notified().await;

        let history = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh(Channel::History, FetchMode::Query).await })
        };
        feed.entered().notified().await;
        assert_eq!(feed.calls(), 2);

        gate.notify_one();
        gate.notify_one();
        assert_eq!(current.await.unwrap(), RefreshOutcome::Updated);
        assert_eq!(history.await.unwrap(), RefreshOutcome::Updated);
        assert_eq!(controller.state(Channel::History).last_timestamp, Some(9000));
    }

    #[tokio::test]
    async fn test_reset_clears_chart() {
        let (feed, board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::Current, Ok(series(&[1000])));
        controller.refresh(Channel::Current, FetchMode::Query).await;

        controller.reset(Channel::Current);
        assert_eq!(
            controller.state(Channel::Current),
            ChannelState {
                generation: 1,
                ..ChannelState::default()
            }
        );
        assert!(board.panel(Channel::Current).chart.is_none());

        let outcome = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert_eq!(board.panel(Channel::Current).charts_created, 2);
    }

    #[tokio::test]
    async fn test_reset_during_fetch_keeps_channel_busy() {
        let gate = Arc::new(Notify::new());
        let (feed, board, controller) = setup(ScriptedDatafeed::gated(gate.clone()));
        feed.push(Channel::Current, Ok(series(&[1000])));
        let controller = Arc::new(controller);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh(Channel::Current, FetchMode::Query).await })
        };
        feed.entered().notified().await;

        controller.reset(Channel::Current);
        assert!(controller.state(Channel::Current).is_fetching);

        let second = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(second, RefreshOutcome::Busy);
        assert_eq!(feed.calls(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::NoChange);

        let state = controller.state(Channel::Current);
        assert!(!state.is_fetching);
        assert_eq!(state.last_timestamp, None);
        assert_eq!(state.phase, ChannelPhase::Idle);
        let panel = board.panel(Channel::Current);
        assert!(panel.chart.is_none());
        assert_eq!(panel.charts_created, 0);
    }

    #[tokio::test]
    async fn test_aborted_refresh_releases_channel() {
        let gate = Arc::new(Notify::new());
        let (feed, _board, controller) = setup(ScriptedDatafeed::gated(gate.clone()));
        feed.push(Channel::History, Ok(series(&[1000])));
        let controller = Arc::new(controller);

        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh(Channel::History, FetchMode::Query).await })
        };
        feed.entered().notified().await;
        assert!(controller.state(Channel::History).is_fetching);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let state = controller.state(Channel::History);
        assert!(!state.is_fetching);
        assert_eq!(state.phase, ChannelPhase::Idle);

        gate.notify_one();
        let outcome = controller.refresh(Channel::History, FetchMode::Query).await;
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert_eq!(feed.calls(), 2);
    }

    #[tokio::test]
    async fn test_update_clears_insufficient() {
        let (feed, _board, controller) = setup(ScriptedDatafeed::new());
        feed.push(Channel::Current, Err(DatafeedError::Insufficient("數據不足".to_string())));
        feed.push(Channel::Current, Ok(series(&[1000])));

        controller.refresh(Channel::Current, FetchMode::Query).await;
        assert!(controller.state(Channel::Current).insufficient);

        let outcome = controller.refresh(Channel::Current, FetchMode::Query).await;
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert!(!controller.state(Channel::Current).insufficient);
    }

    #[test]
    fn test_retryable_outcomes() {
        assert!(RefreshOutcome::Pending.is_retryable());
        assert!(RefreshOutcome::NoChange.is_retryable());
        assert!(RefreshOutcome::Busy.is_retryable());
        assert!(RefreshOutcome::Error("timeout".to_string()).is_retryable());
        assert!(!RefreshOutcome::Updated.is_retryable());
        assert!(!RefreshOutcome::Insufficient.is_retryable());
    }
}
