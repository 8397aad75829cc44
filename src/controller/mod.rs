//! Chart refresh controller and its polling driver.
//!
//! - **engine**: per-channel state, the `refresh` operation and its outcomes
//! - **poller**: bounded retry loop, steady-state follow and the sleep seam

pub mod engine;
pub mod poller;

pub use engine::{ChannelPhase, ChannelState, ChartRefreshController, RefreshOutcome};
pub use poller::{PollReport, Poller, RetryPolicy, Sleeper, TokioSleeper, WatchOptions, WatchReport};
