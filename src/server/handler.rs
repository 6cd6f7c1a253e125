use crate::core::asset::DiffedAsset;
use crate::core::pipeline::{AssetQuery, Pipeline};
use crate::server::error::ErrorResponse;
use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;
use tracing::{error, info};

pub const WELCOME: &str = "Welcome to ATH Diff's API!";

pub async fn welcome() -> &'static str {
    WELCOME
}

/// GET /api/cryptos
///
/// Runs Merge → Diff for the (optionally scoped) tracked set. An empty set is
/// a successful `[]`; an upstream failure is a 500 carrying the details.
pub async fn cryptos(
    State(pipeline): State<Arc<Pipeline>>,
    Query(query): Query<AssetQuery>,
) -> Result<Json<Vec<DiffedAsset>>, ErrorResponse> {
    info!(?query, "request to /api/cryptos");

    match pipeline.diffed_assets(&query).await {
        Ok(assets) => Ok(Json(assets)),
        Err(e) => {
            error!(error = %e, "Failed to build crypto list");
            Err(e.into())
        }
    }
}
