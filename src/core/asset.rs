//! Asset records flowing through the pipeline, from the bundled seed list
//! to the diffed output served over HTTP.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const BUNDLED_ATH_PRICES: &str = include_str!("../../data/ath_prices.json");

/// Static seed record: a symbol and the all-time-high price we recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAsset {
    pub symbol: String,
    #[serde(rename = "athPriceUSD")]
    pub ath_price_usd: f64,
}

/// Provider metadata for an asset, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Latest USD market data for an asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "priceUSD", skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(rename = "percentChange24h", skip_serializing_if = "Option::is_none")]
    pub percent_change_24h: Option<f64>,
    #[serde(rename = "marketCapUSD", skip_serializing_if = "Option::is_none")]
    pub market_cap_usd: Option<f64>,
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A tracked asset joined with whatever metadata and quote data the
/// provider returned for its symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedAsset {
    #[serde(flatten)]
    pub tracked: TrackedAsset,
    #[serde(flatten)]
    pub info: Option<AssetInfo>,
    #[serde(flatten)]
    pub quote: Option<Quote>,
}

impl EnrichedAsset {
    pub fn new(tracked: TrackedAsset) -> Self {
        Self {
            tracked,
            info: None,
            quote: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.tracked.symbol
    }

    /// Display name, falling back to the symbol when metadata is missing.
    pub fn display_name(&self) -> &str {
        self.info
            .as_ref()
            .and_then(|i| i.name.as_deref())
            .unwrap_or(&self.tracked.symbol)
    }

    pub fn current_price_usd(&self) -> Option<f64> {
        self.quote.as_ref().and_then(|q| q.price_usd)
    }
}

/// An enriched asset plus its distance from the all-time high. Both diff
/// fields are `None` when the distance is not computable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffedAsset {
    #[serde(flatten)]
    pub asset: EnrichedAsset,
    #[serde(rename = "athPriceDiffUSD", skip_serializing_if = "Option::is_none")]
    pub ath_price_diff_usd: Option<f64>,
    #[serde(rename = "athPriceDiffPercent", skip_serializing_if = "Option::is_none")]
    pub ath_price_diff_percent: Option<f64>,
}

/// Loads the tracked asset list compiled into the binary.
pub fn load_bundled() -> Result<Arc<[TrackedAsset]>> {
    parse_tracked_assets(BUNDLED_ATH_PRICES).context("Failed to parse bundled ATH price list")
}

/// Loads a tracked asset list from a JSON file, replacing the bundled one.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Arc<[TrackedAsset]>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracked assets file: {}", path.display()))?;
    parse_tracked_assets(&raw)
        .with_context(|| format!("Failed to parse tracked assets file: {}", path.display()))
}

pub fn parse_tracked_assets(raw: &str) -> Result<Arc<[TrackedAsset]>> {
    let assets: Vec<TrackedAsset> = serde_json::from_str(raw)?;

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in &assets {
        if !seen.insert(asset.symbol.to_uppercase()) {
            bail!("Duplicate tracked symbol: {}", asset.symbol);
        }
        if !(asset.ath_price_usd.is_finite() && asset.ath_price_usd > 0.0) {
            warn!(
                symbol = %asset.symbol,
                ath = asset.ath_price_usd,
                "Tracked asset has a non-positive ATH price, its diff will not be computable"
            );
        }
    }

    debug!("Loaded {} tracked assets", assets.len());
    Ok(assets.into())
}
