//! Joins the tracked asset list with provider metadata and latest quotes.
//!
//! The join key is the symbol. Both provider payloads are turned into
//! symbol-keyed maps before the join, so a missing record is an explicit
//! `None` and the asset passes through without that part. Output order and
//! length always match the input.

use crate::core::asset::{AssetInfo, EnrichedAsset, Quote, TrackedAsset};
use crate::core::market::{
    ClientError, InfoParams, MapParams, MarketDataProvider, QuotesParams,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, warn};

/// Which provider endpoint supplies asset metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    #[default]
    Map,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStage {
    Metadata,
    Quotes,
}

impl Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStage::Metadata => write!(f, "asset metadata"),
            FetchStage::Quotes => write!(f, "latest quotes"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to fetch {stage}: {source}")]
    UpstreamFetch {
        stage: FetchStage,
        #[source]
        source: ClientError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> FetchStage {
        match self {
            PipelineError::UpstreamFetch { stage, .. } => *stage,
        }
    }

    pub fn client_error(&self) -> &ClientError {
        match self {
            PipelineError::UpstreamFetch { source, .. } => source,
        }
    }
}

/// Extra parameters forwarded to the metadata request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOptions {
    pub metadata_source: MetadataSource,
    pub listing_status: Option<String>,
    pub sort: Option<String>,
    pub aux: Vec<String>,
}

// Wire records as returned by the provider.

#[derive(Debug, Deserialize)]
struct WireInfo {
    symbol: String,
    id: Option<u64>,
    name: Option<String>,
    slug: Option<String>,
    rank: Option<u32>,
    is_active: Option<u8>,
    logo: Option<String>,
}

impl From<WireInfo> for AssetInfo {
    fn from(w: WireInfo) -> Self {
        AssetInfo {
            id: w.id,
            name: w.name,
            slug: w.slug,
            rank: w.rank,
            is_active: w.is_active.map(|a| a != 0),
            logo: w.logo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireQuoteEntry {
    #[serde(default)]
    quote: HashMap<String, WireUsdQuote>,
}

#[derive(Debug, Deserialize)]
struct WireUsdQuote {
    price: Option<f64>,
    percent_change_24h: Option<f64>,
    market_cap: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}

impl WireQuoteEntry {
    fn into_usd_quote(self) -> Option<Quote> {
        self.quote.into_iter().find_map(|(currency, usd)| {
            (currency == "USD").then_some(Quote {
                price_usd: usd.price,
                percent_change_24h: usd.percent_change_24h,
                market_cap_usd: usd.market_cap,
                last_updated: usd.last_updated,
            })
        })
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(error = %e, "Skipping undecodable {} record", what);
            None
        }
    }
}

/// A symbol-keyed value may be a single object or a list of candidates.
fn first_of(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    }
}

/// Symbols are compared case-insensitively on both sides of the join.
fn join_key(symbol: &str) -> String {
    symbol.to_uppercase()
}

/// Builds a symbol-keyed metadata index. The first record for a symbol wins.
fn index_metadata(data: Value) -> HashMap<String, AssetInfo> {
    let mut index = HashMap::new();
    let records: Vec<Value> = match data {
        Value::Array(items) => items,
        Value::Object(by_symbol) => by_symbol.into_iter().filter_map(|(_, v)| first_of(v)).collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(payload = %other, "Unexpected metadata payload shape");
            Vec::new()
        }
    };

    for record in records {
        if let Some(info) = decode::<WireInfo>(record, "metadata") {
            index
                .entry(join_key(&info.symbol))
                .or_insert_with(|| AssetInfo::from(info));
        }
    }
    index
}

/// Builds a symbol-keyed quote index from a payload keyed by symbol.
fn index_quotes(data: Value) -> HashMap<String, Quote> {
    let by_symbol = match data {
        Value::Object(by_symbol) => by_symbol,
        Value::Null => return HashMap::new(),
        other => {
            warn!(payload = %other, "Unexpected quotes payload shape");
            return HashMap::new();
        }
    };

    by_symbol
        .into_iter()
        .filter_map(|(symbol, value)| {
            let entry = decode::<WireQuoteEntry>(first_of(value)?, "quote")?;
            entry.into_usd_quote().map(|q| (join_key(&symbol), q))
        })
        .collect()
}

/// Enriches `tracked` with metadata and latest quotes.
///
/// Metadata is fetched before quotes. A failure in either stage aborts the
/// whole merge; nothing from an earlier stage is returned.
pub async fn merge_assets(
    provider: &dyn MarketDataProvider,
    tracked: &[TrackedAsset],
    opts: &MergeOptions,
) -> Result<Vec<EnrichedAsset>, PipelineError> {
    if tracked.is_empty() {
        debug!("No tracked assets to merge");
        return Ok(Vec::new());
    }

    let symbols: Vec<String> = tracked.iter().map(|a| join_key(&a.symbol)).collect();

    let metadata = match opts.metadata_source {
        MetadataSource::Map => {
            let params = MapParams {
                listing_status: opts.listing_status.clone(),
                sort: opts.sort.clone(),
                symbol: symbols.clone(),
                aux: opts.aux.clone(),
                ..Default::default()
            };
            provider.cryptocurrency_map(&params).await
        }
        MetadataSource::Info => {
            let params = InfoParams {
                symbol: symbols.clone(),
                aux: opts.aux.clone(),
                ..Default::default()
            };
            provider.cryptocurrency_info(&params).await
        }
    }
    .map_err(|source| PipelineError::UpstreamFetch {
        stage: FetchStage::Metadata,
        source,
    })?;

    let mut info_index = index_metadata(metadata.data);
    let mut assets: Vec<EnrichedAsset> = tracked
        .iter()
        .map(|t| {
            let mut asset = EnrichedAsset::new(t.clone());
            asset.info = info_index.remove(&join_key(&t.symbol));
            if asset.info.is_none() {
                debug!(symbol = %t.symbol, "No metadata for tracked symbol");
            }
            asset
        })
        .collect();

    let quotes = provider
        .quotes_latest(&QuotesParams {
            symbol: symbols,
            convert: Some("USD".to_string()),
            ..Default::default()
        })
        .await
        .map_err(|source| PipelineError::UpstreamFetch {
            stage: FetchStage::Quotes,
            source,
        })?;

    let mut quote_index = index_quotes(quotes.data);
    for asset in &mut assets {
        asset.quote = quote_index.remove(&join_key(&asset.tracked.symbol));
        if asset.quote.is_none() {
            debug!(symbol = %asset.symbol(), "No quote for tracked symbol");
        }
    }

    Ok(assets)
}
