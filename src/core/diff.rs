//! Distance of an asset's current price from its all-time high.
use crate::core::asset::{DiffedAsset, EnrichedAsset};

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Returns `(ath - current, ath / current * 100)`.
///
/// Both are `None` unless the ATH and the current price are positive, finite
/// numbers, so callers never see `Infinity`, `NaN` or a misleading zero.
pub fn compute_diff(ath_price_usd: f64, current_price_usd: Option<f64>) -> Option<(f64, f64)> {
    let ath = usable(Some(ath_price_usd))?;
    let current = usable(current_price_usd)?;
    Some((ath - current, (ath / current) * 100.0))
}

pub fn diff_asset(asset: EnrichedAsset) -> DiffedAsset {
    let diff = compute_diff(asset.tracked.ath_price_usd, asset.current_price_usd());
    DiffedAsset {
        asset,
        ath_price_diff_usd: diff.map(|(usd, _)| usd),
        ath_price_diff_percent: diff.map(|(_, pct)| pct),
    }
}

pub fn diff_assets(assets: Vec<EnrichedAsset>) -> Vec<DiffedAsset> {
    assets.into_iter().map(diff_asset).collect()
}
