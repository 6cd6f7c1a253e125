//! Renders the ranked ATH digest posted to the webhook.

use crate::core::asset::DiffedAsset;
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::fmt::Display;

/// Formats a USD amount as `$1,234.56`, or `-$1,234.56` when negative.
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

fn format_optional_usd(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), format_usd)
}

/// Highest percentage first; entries without a computable diff go last.
pub(crate) fn by_percent_desc(a: &DiffedAsset, b: &DiffedAsset) -> Ordering {
    match (a.ath_price_diff_percent, b.ath_price_diff_percent) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn paragraph(asset: &DiffedAsset) -> String {
    let percent = asset
        .ath_price_diff_percent
        .map_or_else(|| "N/A".to_string(), |p| format!("{p:.2}%"));

    format!(
        "*{}* ({})\nCurrent price: {}\nATH price: {}\nDiff from ATH: {} ({})",
        asset.asset.display_name(),
        asset.asset.symbol(),
        format_optional_usd(asset.asset.current_price_usd()),
        format_usd(asset.asset.tracked.ath_price_usd),
        format_optional_usd(asset.ath_price_diff_usd),
        percent,
    )
}

/// Builds the digest: shuffle, stable-sort by ATH percentage descending,
/// keep the top `max_assets`, and close with a link to `view_more_url`.
///
/// The shuffle runs before the stable sort, so entries with the same
/// percentage come out in a random order on every call.
pub fn format_digest<R: Rng + ?Sized>(
    assets: &[DiffedAsset],
    max_assets: usize,
    view_more_url: &str,
    rng: &mut R,
) -> String {
    let mut ranked: Vec<&DiffedAsset> = assets.iter().collect();
    ranked.shuffle(rng);
    ranked.sort_by(|a, b| by_percent_desc(a, b));

    let mut sections: Vec<String> = ranked.into_iter().take(max_assets).map(paragraph).collect();
    sections.push(format!("See more at {view_more_url}"));
    sections.join("\n\n")
}

/// Same as [`format_digest`], using the thread-local RNG.
pub fn format_digest_random(assets: &[DiffedAsset], max_assets: usize, view_more_url: &str) -> String {
    format_digest(assets, max_assets, view_more_url, &mut rand::rng())
}

/// Message sent in place of the digest when a run fails.
pub fn format_failure(error: &dyn Display) -> String {
    format!("ATH digest failed: {error}")
}
