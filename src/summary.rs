//! Asset statistics overview shown next to the charts.

use crate::chart::{format_price, INSUFFICIENT_TEXT};
use crate::kline::{AssetInfo, WireValue};

/// A past reference price and the change from it to today.
#[derive(Debug, Clone, PartialEq)]
pub struct StatLine {
    pub label: &'static str,
    pub price: Option<f64>,
    /// Percentage change from `price` to the current price
    pub change_pct: Option<f64>,
}

/// Name, current price and historical comparisons of one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetOverview {
    pub asset_name: String,
    pub current: Option<f64>,
    pub lines: Vec<StatLine>,
}

/// Statistics slots as sent by the backend, `[year, month, week, day, today]`
const TODAY: usize = 4;
const REFERENCES: [(usize, &str); 4] = [(3, "昨日價格"), (2, "上周價格"), (1, "上月價格"), (0, "去年價格")];

/// Usable statistic: numeric and not negative
fn statistic(values: &[WireValue], ix: usize) -> Option<f64> {
    values
        .get(ix)
        .and_then(|v| v.as_f64().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn change_pct(current: Option<f64>, reference: Option<f64>) -> Option<f64> {
    match (current, reference) {
        (Some(now), Some(then)) if then != 0.0 => Some((now - then) / then * 100.0),
        _ => None,
    }
}

fn price_text(price: Option<f64>) -> String {
    price.map_or_else(|| INSUFFICIENT_TEXT.to_string(), |p| format_price(p, 3))
}

impl AssetOverview {
    /// Build the overview from an asset info response
    pub fn from_info(info: &AssetInfo) -> Self {
        let current = statistic(&info.statistics, TODAY);
        let lines = REFERENCES
            .iter()
            .map(|&(ix, label)| {
                let price = statistic(&info.statistics, ix);
                StatLine {
                    label,
                    price,
                    change_pct: change_pct(current, price),
                }
            })
            .collect();

        Self {
            asset_name: info.asset_name.clone(),
            current,
            lines,
        }
    }

    /// Text rows: name, current price, then one row per reference
    pub fn render_lines(&self) -> Vec<String> {
        let mut rows = vec![
            format!("資產名稱: {}", self.asset_name),
            format!("目前資產價格: {}", price_text(self.current)),
        ];
        for line in &self.lines {
            let change = line
                .change_pct
                .map_or_else(|| "-".to_string(), |pct| format!("{:+.2}%", pct));
            rows.push(format!("{}: {} ({})", line.label, price_text(line.price), change));
        }
        rows
    }
}
