//! Chart module for displaying k-line charts per channel.
//!
//! This module provides:
//! - `KlineManager` - Data management for k-line points with timestamp indexing
//! - `KlineChart` - Chart handle bound to one container
//! - `ChartBoard` - Loader, error slot and chart container of every channel
//!
//! # Example
//!
//! ```
//! use klinewatch::chart::{ChartBoard, MemoryBoard};
//! use klinewatch::kline::{Channel, KlinePoint};
//!
//! let board = MemoryBoard::new();
//! board.render(Channel::Current, &[KlinePoint::new(1000, 1.0, 2.0, 0.5, 1.5, 10.0)]);
//! assert_eq!(board.panel(Channel::Current).render_count(), 1);
//! ```

mod base;
mod board;
mod manager;
mod widget;

pub use base::*;
pub use board::{ChannelPanel, ChartBoard, MemoryBoard};
pub use manager::KlineManager;
pub use widget::KlineChart;
