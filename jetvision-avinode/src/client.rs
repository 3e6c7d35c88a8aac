use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use jetvision_core::marketplace::MarketplaceApi;
use jetvision_core::BoxError;

/// Connectivity probes time out after this long instead of hanging on a
/// dead marketplace endpoint.
const PING_TIMEOUT: Duration = Duration::from_secs(8);

/// How much raw body text to surface when the marketplace returns non-JSON.
const RAW_BODY_LIMIT: usize = 512;

/// Credentials and addressing for the Avinode marketplace API, built once at
/// process start from the loaded configuration and injected into the client.
#[derive(Debug, Clone)]
pub struct AvinodeConfig {
    pub base_url: String,
    pub api_token: String,
    pub bearer_token: String,
    pub api_version: String,
    pub product: String,
    pub act_as_account: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AvinodeError {
    #[error("Avinode configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Avinode API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Result of creating a marketplace trip, with the deep links the UI needs.
#[derive(Debug, Clone)]
pub struct CreatedTrip {
    pub trip_id: Option<String>,
    pub trip_href: Option<String>,
    pub search_link: Option<String>,
    pub view_link: Option<String>,
    pub raw: Value,
}

/// Low-level HTTP wrapper around the Avinode marketplace API.
///
/// Builds the required auth headers on every call and normalizes non-2xx
/// and non-JSON responses into [`AvinodeError`]. Airport search is the one
/// deliberate exception: it degrades to an empty result instead of failing,
/// since typeahead must never block request creation.
pub struct AvinodeClient {
    client: reqwest::Client,
    config: AvinodeConfig,
    bearer_token: String,
}

/// Clean up a pasted bearer token: strip surrounding quotes (including smart
/// quotes), a leading `Authorization:` label, a leading `Bearer ` prefix, and
/// all whitespace. Anything left that is not printable ASCII means the paste
/// brought in characters the API will reject, so fail up front.
pub fn normalize_bearer_token(raw: &str) -> Result<String, AvinodeError> {
    let quotes: &[char] = &['"', '\'', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];
    let mut token = raw.trim().trim_matches(|c| quotes.contains(&c)).to_string();

    let lower = token.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("authorization:") {
        token = token[token.len() - rest.len()..].trim_start().to_string();
    }
    let lower = token.to_ascii_lowercase();
    if lower.starts_with("bearer ") {
        token = token["bearer ".len()..].to_string();
    }
    token.retain(|c| !c.is_whitespace());

    if token.is_empty() {
        return Err(AvinodeError::Config(
            "bearer token is empty after normalization".to_string(),
        ));
    }
    if token.chars().any(|c| !('\u{21}'..='\u{7e}').contains(&c)) {
        return Err(AvinodeError::Config(
            "bearer token contains non-printable or non-ASCII characters".to_string(),
        ));
    }
    Ok(token)
}

/// Pull a human-readable message out of an error response body.
///
/// Tries `meta.errors[0].message` / `meta.errors[0].title`, then `error`,
/// then `message`; non-JSON bodies surface as truncated raw text.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(doc) = serde_json::from_str::<Value>(body) {
        let candidates = [
            &doc["meta"]["errors"][0]["message"],
            &doc["meta"]["errors"][0]["title"],
            &doc["error"],
            &doc["message"],
        ];
        for c in candidates {
            if let Some(msg) = c.as_str() {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
        return format!("API error {}", status);
    }
    let raw: String = body.chars().take(RAW_BODY_LIMIT).collect();
    if raw.trim().is_empty() {
        format!("API error {}", status)
    } else {
        raw
    }
}

impl AvinodeClient {
    pub fn new(config: AvinodeConfig) -> Result<Self, AvinodeError> {
        if config.api_token.trim().is_empty() {
            return Err(AvinodeError::Config("missing Avinode API token".to_string()));
        }
        let bearer_token = normalize_bearer_token(&config.bearer_token)?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            bearer_token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut builder = self
            .client
            .request(method, url)
            .header("X-Avinode-ApiToken", &self.config.api_token)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .header("X-Avinode-SentTimestamp", Utc::now().to_rfc3339())
            .header("X-Avinode-ApiVersion", &self.config.api_version)
            .header("X-Avinode-Product", &self.config.product);
        if let Some(account) = &self.config.act_as_account {
            builder = builder.header("X-Avinode-ActAsAccount", account);
        }
        builder
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, AvinodeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AvinodeError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }
        let body = response.text().await?;
        serde_json::from_str::<Value>(&body).map_err(|_| AvinodeError::Api {
            status: status.as_u16(),
            message: body.chars().take(RAW_BODY_LIMIT).collect(),
        })
    }

    /// POST /trips: create a trip and return its id plus deep links.
    pub async fn create_trip(&self, payload: &Value) -> Result<CreatedTrip, AvinodeError> {
        let response = self
            .request(reqwest::Method::POST, "/trips")
            .json(payload)
            .send()
            .await?;
        let doc = Self::parse_response(response).await?;
        Ok(trip_links(doc))
    }

    /// GET /airports/search?filter=, degraded mode: every failure becomes an
    /// empty suggestion list. Callers merge in a local directory instead.
    pub async fn search_airports(&self, filter: &str) -> Vec<Value> {
        let result = async {
            let response = self
                .request(reqwest::Method::GET, "/airports/search")
                .query(&[("filter", filter)])
                .send()
                .await?;
            Self::parse_response(response).await
        }
        .await;

        match result {
            Ok(doc) => doc["data"]
                .as_array()
                .or_else(|| doc.as_array())
                .cloned()
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Airport search degraded to empty results: {}", e);
                Vec::new()
            }
        }
    }

    /// GET /trips/{id}
    pub async fn get_trip(&self, trip_id: &str) -> Result<Value, AvinodeError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/trips/{}", trip_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /rfqs/{id}
    pub async fn get_rfq(&self, rfq_id: &str) -> Result<Value, AvinodeError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/rfqs/{}", rfq_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /quotes/{id}
    pub async fn get_quote(&self, quote_id: &str) -> Result<Value, AvinodeError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/quotes/{}", quote_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /tripmsgs/{id}
    pub async fn get_trip_message(&self, message_id: &str) -> Result<Value, AvinodeError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/tripmsgs/{}", message_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /tripmsgs/{id}/chat: send an operator chat message.
    ///
    /// Some tenant API variants reject the nested chat path; on any failure
    /// the call retries as POST /tripmsgs with a reconstructed payload.
    pub async fn send_chat(
        &self,
        message_id: &str,
        trip_id: &str,
        lift_id: Option<&str>,
        message: &str,
    ) -> Result<Value, AvinodeError> {
        let chat = async {
            let response = self
                .request(
                    reqwest::Method::POST,
                    &format!("/tripmsgs/{}/chat", message_id),
                )
                .json(&json!({ "message": message }))
                .send()
                .await?;
            Self::parse_response(response).await
        }
        .await;

        match chat {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    "Chat path rejected for message {}, retrying flat tripmsgs post: {}",
                    message_id,
                    e
                );
                let mut payload = json!({ "tripId": trip_id, "message": message });
                if let Some(lift) = lift_id {
                    payload["liftId"] = json!(lift);
                }
                let response = self
                    .request(reqwest::Method::POST, "/tripmsgs")
                    .json(&payload)
                    .send()
                    .await?;
                Self::parse_response(response).await
            }
        }
    }

    /// PUT /trips/{id}/cancel
    pub async fn cancel_trip(&self, trip_id: &str) -> Result<Value, AvinodeError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/trips/{}/cancel", trip_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /webhooks/settings: subscribe to seller-response events.
    pub async fn configure_webhook(&self, callback_url: &str) -> Result<Value, AvinodeError> {
        let payload = json!({
            "url": callback_url,
            "events": ["TripRequestSellerResponse"],
        });
        let response = self
            .request(reqwest::Method::POST, "/webhooks/settings")
            .json(&payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Connectivity probe with an 8-second cap. Any HTTP response counts as
    /// reachable; only transport failures and the timeout count against it.
    pub async fn ping(&self) -> bool {
        let result = self
            .request(reqwest::Method::GET, "/airports/search")
            .query(&[("filter", "KTEB")])
            .timeout(PING_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Avinode connectivity probe failed: {}", e);
                false
            }
        }
    }
}

/// Pull the trip id, href, and deep links out of a trip creation response,
/// tolerating both enveloped (`data`) and flat layouts.
pub fn trip_links(doc: Value) -> CreatedTrip {
    let body = if doc["data"].is_object() {
        &doc["data"]
    } else {
        &doc
    };
    let trip_id = body["id"]
        .as_str()
        .map(|s| s.to_string())
        .or_else(|| body["tripId"].as_str().map(|s| s.to_string()));
    let trip_href = body["href"].as_str().map(|s| s.to_string());
    let search_link = body["actions"]["searchInAvinode"]["href"]
        .as_str()
        .map(|s| s.to_string());
    let view_link = body["actions"]["viewInAvinode"]["href"]
        .as_str()
        .map(|s| s.to_string());
    CreatedTrip {
        trip_id,
        trip_href,
        search_link,
        view_link,
        raw: doc,
    }
}

#[async_trait]
impl MarketplaceApi for AvinodeClient {
    async fn fetch_trip(&self, trip_id: &str) -> Result<Value, BoxError> {
        Ok(self.get_trip(trip_id).await?)
    }

    async fn fetch_rfq(&self, rfq_id: &str) -> Result<Value, BoxError> {
        Ok(self.get_rfq(rfq_id).await?)
    }

    async fn fetch_quote(&self, quote_id: &str) -> Result<Value, BoxError> {
        Ok(self.get_quote(quote_id).await?)
    }

    async fn fetch_trip_message(&self, message_id: &str) -> Result<Value, BoxError> {
        Ok(self.get_trip_message(message_id).await?)
    }
}
