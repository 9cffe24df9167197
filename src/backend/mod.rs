use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::auth::TokenProvider;
use crate::barcode::Barcode;
use crate::error::LookupError;
use crate::model::FoodItem;

use self::model::{BarcodeRequest, BarcodeResponse, ErrorBody, SearchResponse};

pub mod model;

const MIN_QUERY_CHARS: usize = 2;

/// The single remote operation the dispatcher retries: barcode in, food
/// item or "not found" out.
#[async_trait]
pub trait FoodLookup: Send + Sync {
    async fn lookup_barcode(&self, barcode: &Barcode) -> Result<Option<FoodItem>, LookupError>;
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
    auth: Arc<dyn TokenProvider>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent("foodscan/0.1")
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

impl BackendClient {
    pub fn new(http: Client, base_url: Url, auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    pub fn build_barcode_request(
        &self,
        token: &str,
        barcode: &Barcode,
    ) -> Result<reqwest::Request, LookupError> {
        let endpoint = self
            .base_url
            .join("food/barcode")
            .map_err(|e| LookupError::Other(format!("invalid backend URL: {}", e)))?;
        self.http
            .post(endpoint)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&BarcodeRequest {
                barcode: barcode.as_str(),
            })
            .build()
            .map_err(LookupError::Transport)
    }

    pub fn build_search_request(
        &self,
        token: &str,
        query: &str,
        min_healthiness: u8,
    ) -> Result<reqwest::Request, LookupError> {
        let endpoint = self
            .base_url
            .join("food/search")
            .map_err(|e| LookupError::Other(format!("invalid backend URL: {}", e)))?;
        self.http
            .get(endpoint)
            .bearer_auth(token)
            .query(&[
                ("query", query.to_string()),
                ("min_healthiness", min_healthiness.to_string()),
            ])
            .build()
            .map_err(LookupError::Transport)
    }

    /// Send `request` and return the body of a 2xx response. Error bodies are
    /// mapped onto [`LookupError`] with the backend's `detail` as message.
    async fn execute(&self, request: reqwest::Request) -> Result<String, LookupError> {
        debug!(method=%request.method(), url=%request.url(), "sending backend request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = error.message().unwrap_or_else(|| body.clone());
            warn!(%status, %message, "backend request failed");
            if error.is_whitelist_rejection() {
                return Err(LookupError::ProviderWhitelist(message));
            }
            return Err(LookupError::Status { status, message });
        }
        Ok(body)
    }

    #[instrument(skip(self, barcode), fields(barcode = %barcode))]
    pub async fn lookup_barcode(&self, barcode: &Barcode) -> Result<Option<FoodItem>, LookupError> {
        let token = self.auth.access_token().await?;
        let request = self.build_barcode_request(&token, barcode)?;
        let body = self.execute(request).await?;
        parse_barcode_response(&body)
    }

    #[instrument(skip(self))]
    pub async fn search_foods(
        &self,
        query: &str,
        min_healthiness: u8,
    ) -> Result<Vec<FoodItem>, LookupError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(LookupError::InvalidQuery(format!(
                "query must be at least {} characters long",
                MIN_QUERY_CHARS
            )));
        }
        let token = self.auth.access_token().await?;
        let request = self.build_search_request(&token, query, min_healthiness)?;
        let body = self.execute(request).await?;
        let payload: SearchResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(payload.results)
    }
}

#[async_trait]
impl FoodLookup for BackendClient {
    async fn lookup_barcode(&self, barcode: &Barcode) -> Result<Option<FoodItem>, LookupError> {
        BackendClient::lookup_barcode(self, barcode).await
    }
}

/// Interpret a 2xx barcode response. The envelope form carries `success`;
/// a bare food object is accepted as a hit; anything else is "not found".
pub fn parse_barcode_response(body: &str) -> Result<Option<FoodItem>, LookupError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    if value.get("success").is_some() {
        let envelope: BarcodeResponse =
            serde_json::from_value(value).map_err(|e| LookupError::Decode(e.to_string()))?;
        if !envelope.success {
            debug!(message = ?envelope.message, "backend reported no match");
            return Ok(None);
        }
        return Ok(envelope.food);
    }

    if value.get("food_name").is_some() {
        let item: FoodItem =
            serde_json::from_value(value).map_err(|e| LookupError::Decode(e.to_string()))?;
        return Ok(Some(item));
    }

    Ok(None)
}
