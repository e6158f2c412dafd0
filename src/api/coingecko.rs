use crate::error::FeedError;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko client used for the USDT reference rate
///
/// Only the operator-facing profit estimate uses this; analysis never does.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

/// Response from /simple/price: `{ "tether": { "vnd": 26712.0 } }`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Price of one USDT in `vs_currency`
    pub async fn get_usdt_rate(&self, vs_currency: &str) -> Result<f64, FeedError> {
        let vs_currency = vs_currency.to_lowercase();
        let url = format!("{}/simple/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", "tether"), ("vs_currencies", vs_currency.as_str())])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let prices: SimplePriceResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))?;

        let rate = prices
            .get("tether")
            .and_then(|quotes| quotes.get(&vs_currency))
            .copied()
            .ok_or(FeedError::EmptyData("tether rate"))?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(FeedError::Malformed(format!("invalid rate {}", rate)));
        }

        Ok(rate)
    }

    /// USDT→VND rate, or `fallback` if the request fails for any reason
    pub async fn usdt_vnd_rate_or(&self, fallback: f64) -> f64 {
        match self.get_usdt_rate("vnd").await {
            Ok(rate) => {
                tracing::info!(rate, "Fetched USDT/VND reference rate");
                rate
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch USDT/VND rate ({}), using fallback {}",
                    e,
                    fallback
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> CoinGeckoClient {
        CoinGeckoClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_usdt_rate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "tether".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "vnd".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"tether":{"vnd":26512.0}}"#)
            .create_async()
            .await;

        let rate = client_for(&server).get_usdt_rate("VND").await.unwrap();

        mock.assert_async().await;
        assert_eq!(rate, 26512.0);
    }

    #[tokio::test]
    async fn test_fallback_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let rate = client_for(&server).usdt_vnd_rate_or(26_700.0).await;
        assert_eq!(rate, 26_700.0);
    }

    #[tokio::test]
    async fn test_fallback_on_missing_currency() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"tether":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.get_usdt_rate("vnd").await,
            Err(FeedError::EmptyData(_))
        ));
        assert_eq!(client.usdt_vnd_rate_or(26_700.0).await, 26_700.0);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_get_usdt_rate_live() {
        let client = CoinGeckoClient::new(COINGECKO_API_BASE, Duration::from_secs(5)).unwrap();
        let rate = client.get_usdt_rate("vnd").await.unwrap();
        assert!(rate > 10_000.0);
    }
}
