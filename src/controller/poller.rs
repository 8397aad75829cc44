//! Bounded polling driver around the refresh controller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::engine::{ChartRefreshController, RefreshOutcome};
use crate::base::setting::Settings;
use crate::kline::{Channel, FetchMode};

/// Default delay between warm-up attempts in milliseconds
pub const DEFAULT_INTERVAL_MS: i64 = 3_000;
/// Default number of warm-up attempts
pub const DEFAULT_MAX_ATTEMPTS: i64 = 20;
/// Default delay between steady-state refreshes in milliseconds
pub const DEFAULT_STEADY_INTERVAL_MS: i64 = 60_000;
/// Outcomes kept by a [`PollReport`]
pub const REPORT_HISTORY: usize = 16;

fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn to_millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or(0))
}

/// Fixed-interval retry policy with an attempt bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Warm-up policy from `poll.max_attempts` and `poll.interval`
    pub fn from_settings(settings: &Settings) -> Self {
        let attempts = settings.get_int("poll.max_attempts").unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let interval = settings.get_int("poll.interval").unwrap_or(DEFAULT_INTERVAL_MS);
        Self::new(to_count(attempts), to_millis(interval))
    }

    /// Steady-state policy from `poll.steady_rounds` and `poll.steady_interval`
    pub fn steady_from_settings(settings: &Settings) -> Self {
        let rounds = settings.get_int("poll.steady_rounds").unwrap_or(0);
        let interval = settings
            .get_int("poll.steady_interval")
            .unwrap_or(DEFAULT_STEADY_INTERVAL_MS);
        Self::new(to_count(rounds), to_millis(interval))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(to_count(DEFAULT_MAX_ATTEMPTS), to_millis(DEFAULT_INTERVAL_MS))
    }
}

/// Source of delays between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Summary of one polling run.
///
/// Counts every attempt but keeps only the latest [`REPORT_HISTORY`]
/// outcomes, so an open-ended follow does not grow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub channel: Channel,
    attempts: u64,
    updates: u64,
    last: Option<RefreshOutcome>,
    recent: VecDeque<RefreshOutcome>,
}

impl PollReport {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            attempts: 0,
            updates: 0,
            last: None,
            recent: VecDeque::with_capacity(REPORT_HISTORY),
        }
    }

    /// Report of a channel that was not polled because it already settled
    fn settled(channel: Channel, outcome: RefreshOutcome) -> Self {
        Self {
            last: Some(outcome),
            ..Self::new(channel)
        }
    }

    fn record(&mut self, outcome: RefreshOutcome) {
        self.attempts += 1;
        if outcome == RefreshOutcome::Updated {
            self.updates += 1;
        }
        if self.recent.len() == REPORT_HISTORY {
            self.recent.pop_front();
        }
        self.recent.push_back(outcome.clone());
        self.last = Some(outcome);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Number of attempts that rendered new data
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn last_outcome(&self) -> Option<&RefreshOutcome> {
        self.last.as_ref()
    }

    /// Latest outcomes, oldest first
    pub fn outcomes(&self) -> Vec<RefreshOutcome> {
        self.recent.iter().cloned().collect()
    }

    /// Whether any attempt rendered new data
    pub fn updated(&self) -> bool {
        self.updates > 0
    }
}

/// How to follow a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchOptions {
    /// Send one prime request before polling
    pub prime: bool,
    pub warmup: RetryPolicy,
    /// Slower cadence after the first update; `None` stops there
    pub steady: Option<RetryPolicy>,
}

/// Result of [`Poller::watch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchReport {
    pub prime: Option<RefreshOutcome>,
    pub warmup: Option<PollReport>,
    pub steady: Option<PollReport>,
}

/// Repeatedly refreshes channels with bounded attempts.
pub struct Poller {
    controller: Arc<ChartRefreshController>,
    sleeper: Arc<dyn Sleeper>,
}

impl Poller {
    pub fn new(controller: Arc<ChartRefreshController>) -> Self {
        Self::with_sleeper(controller, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(controller: Arc<ChartRefreshController>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { controller, sleeper }
    }

    pub fn controller(&self) -> &Arc<ChartRefreshController> {
        &self.controller
    }

    /// Refresh until `stop` accepts an outcome or the attempts run out.
    ///
    /// Waits `policy.interval` between attempts, never before the first.
    /// A channel the backend reported as lacking data is not polled again.
    pub async fn poll<F>(&self, channel: Channel, mode: FetchMode, policy: RetryPolicy, stop: F) -> PollReport
    where
        F: Fn(&RefreshOutcome) -> bool + Send + Sync,
    {
        if self.controller.state(channel).insufficient {
            debug!("{} has insufficient data, not polling", channel);
            return PollReport::settled(channel, RefreshOutcome::Insufficient);
        }

        let mut report = PollReport::new(channel);

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                self.sleeper.sleep(policy.interval).await;
            }

            let outcome = self.controller.refresh(channel, mode).await;
            debug!("{} attempt {}/{}: {}", channel, attempt, policy.max_attempts, outcome);

            let done = stop(&outcome);
            report.record(outcome);
            if done {
                break;
            }
        }

        report
    }

    /// Poll until data is rendered or the channel is known to lack data
    pub async fn poll_until_updated(&self, channel: Channel, policy: RetryPolicy) -> PollReport {
        self.poll(channel, FetchMode::Query, policy, |outcome| !outcome.is_retryable())
            .await
    }

    /// Optionally prime, warm up until data arrives, then follow at the
    /// steady cadence.
    pub async fn watch(&self, channel: Channel, options: WatchOptions) -> WatchReport {
        let mut report = WatchReport {
            prime: None,
            warmup: None,
            steady: None,
        };

        if options.prime && !self.controller.state(channel).insufficient {
            let outcome = self.controller.refresh(channel, FetchMode::Prime).await;
            let failed = matches!(outcome, RefreshOutcome::Error(_) | RefreshOutcome::Insufficient);
            report.prime = Some(outcome);
            if failed {
                return report;
            }
            self.sleeper.sleep(options.warmup.interval).await;
        }

        let warmup = self.poll_until_updated(channel, options.warmup).await;
        let ready = warmup.last_outcome() == Some(&RefreshOutcome::Updated);
        report.warmup = Some(warmup);

        match options.steady {
            Some(steady) if ready && steady.max_attempts > 0 => {
                info!("{} 進入定期更新, 每{:?}一次", channel, steady.interval);
                self.sleeper.sleep(steady.interval).await;
                let steady_report = self
                    .poll(channel, FetchMode::Query, steady, |outcome| {
                        *outcome == RefreshOutcome::Insufficient
                    })
                    .await;
                report.steady = Some(steady_report);
            }
            _ => {}
        }

        report
    }
}
