//! Market data abstractions: request parameters, the raw provider payload
//! and the error kinds an upstream call can fail with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Parsed provider payload. The shape of `data` is left to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub data: Value,
}

impl From<Value> for ProviderResponse {
    /// Takes `status` and `data` from an object body. Any other JSON value
    /// yields an empty response.
    fn from(body: Value) -> Self {
        match body {
            Value::Object(mut fields) => ProviderResponse {
                status: fields.remove("status").filter(|s| !s.is_null()),
                data: fields.remove("data").unwrap_or(Value::Null),
            },
            _ => ProviderResponse::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No response from provider: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Provider responded with HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Provider returned a non-JSON payload (HTTP {status}): {source}")]
    InvalidPayload {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Upstream HTTP status, when the provider answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ClientError::Provider { status, .. } | ClientError::InvalidPayload { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ClientError::Provider { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Query for `cryptocurrency/map`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapParams {
    pub listing_status: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub symbol: Vec<String>,
    pub aux: Vec<String>,
}

/// Query for `cryptocurrency/info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoParams {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub symbol: Vec<String>,
    pub aux: Vec<String>,
}

/// Query for `cryptocurrency/quotes/latest`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotesParams {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub symbol: Vec<String>,
    pub convert: Option<String>,
    pub aux: Vec<String>,
}

/// Query for `cryptocurrency/price-performance-stats/latest`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricePerformanceParams {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub symbol: Vec<String>,
    /// e.g. `all_time`, `yesterday`, `24h`.
    pub time_period: Vec<String>,
    pub convert: Option<String>,
    pub convert_id: Option<String>,
    pub skip_invalid: Option<bool>,
}

/// Flattens request parameters into query pairs, dropping unset values and
/// joining lists with commas.
pub trait QueryPairs {
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

fn push_opt(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(v) = value {
        pairs.push((key, v));
    }
}

fn push_list(pairs: &mut Vec<(&'static str, String)>, key: &'static str, values: &[String]) {
    if !values.is_empty() {
        pairs.push((key, values.join(",")));
    }
}

impl QueryPairs for MapParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "listing_status", self.listing_status.clone());
        push_opt(&mut pairs, "start", self.start.map(|s| s.to_string()));
        push_opt(&mut pairs, "limit", self.limit.map(|l| l.to_string()));
        push_opt(&mut pairs, "sort", self.sort.clone());
        push_list(&mut pairs, "symbol", &self.symbol);
        push_list(&mut pairs, "aux", &self.aux);
        pairs
    }
}

impl QueryPairs for InfoParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "id", self.id.clone());
        push_opt(&mut pairs, "slug", self.slug.clone());
        push_list(&mut pairs, "symbol", &self.symbol);
        push_list(&mut pairs, "aux", &self.aux);
        pairs
    }
}

impl QueryPairs for QuotesParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "id", self.id.clone());
        push_opt(&mut pairs, "slug", self.slug.clone());
        push_list(&mut pairs, "symbol", &self.symbol);
        push_opt(&mut pairs, "convert", self.convert.clone());
        push_list(&mut pairs, "aux", &self.aux);
        pairs
    }
}

impl QueryPairs for PricePerformanceParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "id", self.id.clone());
        push_opt(&mut pairs, "slug", self.slug.clone());
        push_list(&mut pairs, "symbol", &self.symbol);
        push_list(&mut pairs, "time_period", &self.time_period);
        push_opt(&mut pairs, "convert", self.convert.clone());
        push_opt(&mut pairs, "convert_id", self.convert_id.clone());
        push_opt(&mut pairs, "skip_invalid", self.skip_invalid.map(|b| b.to_string()));
        pairs
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn cryptocurrency_map(&self, params: &MapParams) -> Result<ProviderResponse, ClientError>;

    async fn cryptocurrency_info(
        &self,
        params: &InfoParams,
    ) -> Result<ProviderResponse, ClientError>;

    async fn quotes_latest(&self, params: &QuotesParams) -> Result<ProviderResponse, ClientError>;

    /// Provider-side price performance, including all-time highs and lows.
    async fn price_performance_stats(
        &self,
        params: &PricePerformanceParams,
    ) -> Result<ProviderResponse, ClientError>;
}
