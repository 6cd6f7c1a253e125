use crate::core::market::{
    ClientError, InfoParams, MapParams, MarketDataProvider, PricePerformanceParams,
    ProviderResponse, QueryPairs, QuotesParams,
};
use serde_json::Value;
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";
const API_KEY_HEADER: &str = "x-cmc_pro_api_key";

/// Thin CoinMarketCap REST client. Holds the credential and base URL, and
/// nothing else; every call is a single attempt.
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoinMarketCapClient {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ClientError::Configuration("CoinMarketCap API key is required".into()))?;

        Url::parse(base_url).map_err(|e| {
            ClientError::Configuration(format!("Invalid provider base URL {base_url}: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|_| ClientError::Configuration("API key is not a valid header value".into()))?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let mut builder = reqwest::Client::builder()
            .user_agent("athdiff/0.1")
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &impl QueryPairs,
    ) -> Result<ProviderResponse, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let url = Url::parse_with_params(&url, params.query_pairs())
            .map_err(|e| ClientError::Configuration(format!("Invalid request URL {url}: {e}")))?;
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ClientError::Transport)?;

        if !status.is_success() {
            return Err(ClientError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value =
            serde_json::from_str(&body).map_err(|source| ClientError::InvalidPayload {
                status: status.as_u16(),
                source,
            })?;
        Ok(ProviderResponse::from(body))
    }
}

#[async_trait]
impl MarketDataProvider for CoinMarketCapClient {
    #[instrument(name = "CmcMap", skip_all, fields(symbols = params.symbol.len()))]
    async fn cryptocurrency_map(&self, params: &MapParams) -> Result<ProviderResponse, ClientError> {
        self.get("/cryptocurrency/map", params).await
    }

    #[instrument(name = "CmcInfo", skip_all, fields(symbols = params.symbol.len()))]
    async fn cryptocurrency_info(
        &self,
        params: &InfoParams,
    ) -> Result<ProviderResponse, ClientError> {
        self.get("/cryptocurrency/info", params).await
    }

    #[instrument(name = "CmcQuotes", skip_all, fields(symbols = params.symbol.len()))]
    async fn quotes_latest(&self, params: &QuotesParams) -> Result<ProviderResponse, ClientError> {
        self.get("/cryptocurrency/quotes/latest", params).await
    }

    #[instrument(name = "CmcPricePerformance", skip_all, fields(symbols = params.symbol.len()))]
    async fn price_performance_stats(
        &self,
        params: &PricePerformanceParams,
    ) -> Result<ProviderResponse, ClientError> {
        self.get("/cryptocurrency/price-performance-stats/latest", params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MAP_JSON: &str = r#"{
        "status": {"error_code": 0, "error_message": null},
        "data": [
            {"id": 1, "rank": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin", "is_active": 1},
            {"id": 1027, "rank": 2, "name": "Ethereum", "symbol": "ETH", "slug": "ethereum", "is_active": 1}
        ]
    }"#;

    fn client_for(server: &MockServer) -> CoinMarketCapClient {
        CoinMarketCapClient::new(&server.uri(), Some("test-key"), None).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        for key in [None, Some(""), Some("   ")] {
            let result = CoinMarketCapClient::new(DEFAULT_BASE_URL, key, None);
            assert!(matches!(result, Err(ClientError::Configuration(_))));
        }
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = CoinMarketCapClient::new("not a url", Some("key"), None);
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_map_sends_key_and_joined_symbols() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/map"))
            .and(header("x-cmc_pro_api_key", "test-key"))
            .and(query_param("symbol", "BTC,ETH"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MAP_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let params = MapParams {
            symbol: vec!["BTC".to_string(), "ETH".to_string()],
            ..Default::default()
        };
        let response = client_for(&server).cryptocurrency_map(&params).await.unwrap();

        assert_eq!(response.data.as_array().map(Vec::len), Some(2));
        assert_eq!(response.data[0]["slug"], "bitcoin");
        assert!(response.status.is_some());
    }

    #[tokio::test]
    async fn test_quotes_hit_latest_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/quotes/latest"))
            .and(query_param("symbol", "BTC"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": {"BTC": {"symbol": "BTC", "quote": {"USD": {"price": 30000.5}}}}}"#,
            ))
            .mount(&server)
            .await;

        let params = QuotesParams {
            symbol: vec!["BTC".to_string()],
            ..Default::default()
        };
        let response = client_for(&server).quotes_latest(&params).await.unwrap();
        assert_eq!(response.data["BTC"]["quote"]["USD"]["price"], 30000.5);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/info"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"status": {"error_message": "API key missing."}}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .cryptocurrency_info(&InfoParams::default())
            .await
            .unwrap_err();

        match err {
            ClientError::Provider { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("API key missing."));
            }
            other => panic!("Expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/map"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .cryptocurrency_map(&MapParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_json_array_body_is_not_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/map"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .cryptocurrency_map(&MapParams::default())
            .await
            .unwrap();
        assert!(response.status.is_none());
        assert!(response.data.is_null());
    }

    #[tokio::test]
    async fn test_price_performance_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cryptocurrency/price-performance-stats/latest"))
            .and(header("x-cmc_pro_api_key", "test-key"))
            .and(query_param("symbol", "BTC"))
            .and(query_param("time_period", "all_time"))
            .and(query_param("convert", "USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": {"BTC": {"symbol": "BTC", "periods": {"all_time":
                    {"quote": {"USD": {"high": 69044.77, "low": 65.53}}}}}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let params = PricePerformanceParams {
            symbol: vec!["BTC".to_string()],
            time_period: vec!["all_time".to_string()],
            convert: Some("USD".to_string()),
            ..Default::default()
        };
        let response = client_for(&server)
            .price_performance_stats(&params)
            .await
            .unwrap();
        assert_eq!(
            response.data["BTC"]["periods"]["all_time"]["quote"]["USD"]["high"],
            69044.77
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Nothing listens on port 1.
        let client = CoinMarketCapClient::new("http://127.0.0.1:1", Some("key"), None).unwrap();
        let err = client
            .cryptocurrency_map(&MapParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.upstream_status(), None);
    }
}
