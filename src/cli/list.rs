use super::ui;
use crate::core::asset::DiffedAsset;
use crate::core::digest::{by_percent_desc, format_usd};
use crate::core::pipeline::{AssetQuery, Pipeline};
use anyhow::Result;
use comfy_table::Cell;

/// Renders the diffed dataset, furthest from ATH first.
pub fn display_as_table(assets: &[DiffedAsset]) -> String {
    let mut ranked: Vec<&DiffedAsset> = assets.iter().collect();
    ranked.sort_by(|a, b| by_percent_desc(a, b));

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("ATH (USD)"),
        ui::header_cell("Diff (USD)"),
        ui::header_cell("ATH / Price"),
    ]);

    for diffed in ranked {
        let asset = &diffed.asset;
        table.add_row(vec![
            Cell::new(asset.display_name()),
            Cell::new(asset.symbol()),
            ui::format_optional_cell(asset.current_price_usd(), format_usd),
            ui::format_optional_cell(Some(asset.tracked.ath_price_usd), format_usd),
            ui::format_optional_cell(diffed.ath_price_diff_usd, format_usd),
            ui::ath_percent_cell(diffed.ath_price_diff_percent),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Distance from all-time high", ui::StyleType::Title),
        table
    )
}

pub async fn run(pipeline: &Pipeline, query: &AssetQuery) -> Result<()> {
    let spinner = ui::new_spinner("Fetching market data...");
    let result = pipeline.diffed_assets(query).await;
    spinner.finish_and_clear();

    let assets = result?;
    if assets.is_empty() {
        println!(
            "{}",
            ui::style_text("No tracked assets matched.", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    println!("{}", display_as_table(&assets));
    Ok(())
}
