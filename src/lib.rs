//! Klinewatch - k-line chart refresh client for an asset-tracking backend
//!
//! This crate provides:
//!
//! - K-line domain types and their wire decoding
//! - Datafeed abstraction with a REST implementation
//! - Chart board holding loader, error slot and chart of every channel
//! - Refresh controller with per-channel state and a bounded polling driver
//! - Asset statistics overview
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use klinewatch::{Channel, ChartRefreshController, KlineRestClient, MemoryBoard, Poller, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let feed = KlineRestClient::new("http://localhost:8080", std::time::Duration::from_secs(30)).unwrap();
//!     let board = Arc::new(MemoryBoard::new());
//!     let controller = Arc::new(ChartRefreshController::new(1, Arc::new(feed), board));
//!
//!     let poller = Poller::new(controller);
//!     let report = poller.poll_until_updated(Channel::Current, RetryPolicy::default()).await;
//!     println!("{:?}", report.last_outcome());
//! }
//! ```

pub mod base;
pub mod chart;
pub mod controller;
pub mod datafeed;
pub mod kline;
pub mod summary;

// Re-export commonly used types
pub use base::{init_logger, Settings, SETTINGS};
pub use chart::{ChartBoard, KlineChart, MemoryBoard};
pub use controller::{
    ChannelPhase, ChannelState, ChartRefreshController, PollReport, Poller, RefreshOutcome, RetryPolicy,
    WatchOptions, WatchReport,
};
pub use datafeed::{BaseDatafeed, DatafeedError, KlineRestClient};
pub use kline::{Channel, FetchMode, KlinePoint, KlineSeries};
pub use summary::AssetOverview;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
