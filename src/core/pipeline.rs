//! Merge → Diff, scoped by an optional query.

use crate::core::asset::{DiffedAsset, TrackedAsset};
use crate::core::diff::diff_assets;
use crate::core::market::MarketDataProvider;
use crate::core::merge::{MergeOptions, MetadataSource, PipelineError, merge_assets};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Optional scoping for a pipeline run, as accepted by `GET /api/cryptos`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssetQuery {
    pub listing_status: Option<String>,
    /// 1-based offset into the tracked list.
    pub start: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    /// Comma-separated symbols.
    pub symbol: Option<String>,
    /// Comma-separated auxiliary fields.
    pub aux: Option<String>,
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl AssetQuery {
    /// Applies the symbol filter and pagination, keeping tracked order.
    pub fn scope(&self, tracked: &[TrackedAsset]) -> Vec<TrackedAsset> {
        let wanted: Vec<String> = split_csv(self.symbol.as_deref())
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();
        let skip = self.start.map_or(0, |s| s.saturating_sub(1) as usize);
        let take = self.limit.map_or(usize::MAX, |l| l as usize);

        tracked
            .iter()
            .filter(|a| wanted.is_empty() || wanted.contains(&a.symbol.to_uppercase()))
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    pub fn merge_options(&self, metadata_source: MetadataSource) -> MergeOptions {
        MergeOptions {
            metadata_source,
            listing_status: self.listing_status.clone(),
            sort: self.sort.clone(),
            aux: split_csv(self.aux.as_deref()),
        }
    }
}

/// Everything a pipeline run needs. Built once at startup and handed to the
/// HTTP handlers, the scheduler and the CLI.
#[derive(Clone)]
pub struct Pipeline {
    provider: Arc<dyn MarketDataProvider>,
    tracked: Arc<[TrackedAsset]>,
    metadata_source: MetadataSource,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        tracked: Arc<[TrackedAsset]>,
        metadata_source: MetadataSource,
    ) -> Self {
        Self {
            provider,
            tracked,
            metadata_source,
        }
    }

    pub fn tracked(&self) -> &[TrackedAsset] {
        &self.tracked
    }

    pub async fn diffed_assets(&self, query: &AssetQuery) -> Result<Vec<DiffedAsset>, PipelineError> {
        let scoped = query.scope(&self.tracked);
        debug!(
            tracked = self.tracked.len(),
            scoped = scoped.len(),
            "Running merge pipeline"
        );
        let merged = merge_assets(
            self.provider.as_ref(),
            &scoped,
            &query.merge_options(self.metadata_source),
        )
        .await?;
        Ok(diff_assets(merged))
    }
}
