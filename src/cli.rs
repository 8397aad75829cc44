use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use klinewatch::Channel;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Asset id on the backend.
    pub asset_id: u64,

    /// Which chart channels to follow.
    #[arg(long, value_enum, default_value_t = ChannelArg::All)]
    pub channel: ChannelArg,

    /// Ask the backend to compute k-line data before polling.
    #[arg(long)]
    pub prime: bool,

    /// Keep refreshing at the steady cadence after the first update.
    #[arg(long)]
    pub follow: bool,

    /// Backend base URL, overrides `server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Bearer token, overrides `server.token`.
    #[arg(long)]
    pub token: Option<String>,

    /// Settings file to use instead of the one in the working folder.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelArg {
    Current,
    History,
    All,
}

impl ChannelArg {
    pub fn channels(self) -> Vec<Channel> {
        match self {
            ChannelArg::Current => vec![Channel::Current],
            ChannelArg::History => vec![Channel::History],
            ChannelArg::All => Channel::ALL.to_vec(),
        }
    }
}
