//! K-line domain types.
//!
//! - **constant**: channel and fetch mode enums
//! - **object**: k-line points, series and the wire formats they decode from

pub mod constant;
pub mod object;

pub use constant::{Channel, FetchMode};
pub use object::{AssetInfo, KlinePoint, KlineResponse, KlineSeries, RawKlinePoint, WireValue};
