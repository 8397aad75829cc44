//! Klinewatch - command line entry point
//!
//! Polls the k-line chart channels of one asset and prints what was drawn.

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use futures_util::future::join_all;
use tracing::{info, warn};

use klinewatch::base::SettingValue;
use klinewatch::chart::ChannelPanel;
use klinewatch::controller::{Poller, RetryPolicy, WatchOptions};
use klinewatch::{
    init_logger, AssetOverview, BaseDatafeed, ChartRefreshController, KlineRestClient, MemoryBoard, Settings,
    SETTINGS,
};

mod cli;

fn apply_overrides(cli: &cli::Cli, settings: &Settings) {
    if let Some(host) = &cli.host {
        settings.set("server.host", SettingValue::String(host.clone()));
    }
    if let Some(token) = &cli.token {
        settings.set("server.token", SettingValue::String(token.clone()));
    }
}

fn describe_panel(panel: &ChannelPanel) -> String {
    match (&panel.chart, &panel.error_text) {
        (Some(chart), _) => chart.describe(),
        (None, Some(error)) => format!("error: {}", error),
        (None, None) if panel.loader_visible => "still loading".to_string(),
        (None, None) => "no data".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli::Cli::parse();
    let loaded;
    let settings: &Settings = match &cli.config {
        Some(path) => {
            loaded = Settings::load_from(path)?;
            &loaded
        }
        None => &*SETTINGS,
    };
    apply_overrides(&cli, settings);
    init_logger(settings)?;
    info!("Command line input recorded: {cli:?}");

    let feed = Arc::new(KlineRestClient::from_settings(settings)?);
    info!("✅ 數據服務: {}", feed.host());

    match feed.query_asset_info(cli.asset_id).await {
        Ok(asset) => {
            for row in AssetOverview::from_info(&asset).render_lines() {
                info!("{}", row);
            }
        }
        Err(e) => warn!("取得資產資訊失敗: {}", e),
    }

    let indicator = settings.get_string("chart.indicator").unwrap_or_default();
    let board = Arc::new(MemoryBoard::with_indicator(indicator));
    let controller = Arc::new(ChartRefreshController::new(cli.asset_id, feed, board.clone()));
    let poller = Poller::new(controller);

    let steady = RetryPolicy::steady_from_settings(settings);
    let options = WatchOptions {
        prime: cli.prime,
        warmup: RetryPolicy::from_settings(settings),
        steady: cli.follow.then(|| {
            if steady.max_attempts == 0 {
                RetryPolicy::new(u32::MAX, steady.interval)
            } else {
                steady
            }
        }),
    };

    let channels = cli.channel.channels();
    let reports = join_all(channels.iter().map(|&channel| poller.watch(channel, options))).await;

    for (channel, report) in channels.iter().zip(reports) {
        let attempts = report.warmup.as_ref().map_or(0, |r| r.attempts());
        let panel = board.panel(*channel);
        println!(
            "{} ({}): {} [{} attempts]",
            channel,
            channel.display_name(),
            describe_panel(&panel),
            attempts
        );
    }

    Ok(())
}
