// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider`.
//
// ## Behavior
//
// - One HTTP request per call, except listings which follow pagination
// - Full error propagation to the job (the job owns failure policy)
// - HTTP timeout configured (30 seconds by default)
// - NO retry, backoff, caching or background tasks
//
// ## Security Requirements
//
// - The API token is attached once, as a default `Authorization` header
//   marked sensitive, and never appears in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Verify Token: GET `/user/tokens/verify`
// - List Zones: GET `/zones`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cf_ddns_core::{Credential, DnsProvider, Error, ProviderConfig, RawRecord, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const PROVIDER_NAME: &str = "cloudflare";

/// Page size requested from listing endpoints
const PER_PAGE: u32 = 50;

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,

    #[serde(default)]
    errors: Vec<ApiMessage>,

    result: Option<T>,

    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

impl<T> Envelope<T> {
    /// `code: message` pairs joined with " / "
    fn error_list(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Classify a non-2xx response
///
/// A body carrying Cloudflare's error envelope becomes [`Error::Provider`];
/// anything else (HTML error pages, empty bodies) is [`Error::Transport`].
fn classify_failure(what: &str, status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.success && !envelope.errors.is_empty() => Error::provider(
            PROVIDER_NAME,
            format!("{} failed with {}: {}", what, status, envelope.error_list()),
        ),
        _ => Error::transport(format!("{} failed: {}", what, status)),
    }
}

/// Whether a listing has pages after `page`
///
/// A response without `result_info` is a single page.
fn has_next_page(page: u32, info: Option<&ResultInfo>) -> bool {
    info.is_some_and(|info| page < info.total_pages)
}

/// Interpret the token verification response
///
/// The verify endpoint answers with an envelope whatever the status, so the
/// `success` flag decides.
fn interpret_verification(status: StatusCode, body: &str) -> Result<()> {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if envelope.success => Ok(()),
        Ok(envelope) if !envelope.errors.is_empty() => Err(Error::CredentialInvalid(
            envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" / "),
        )),
        Ok(_) => Err(Error::CredentialInvalid(format!("token rejected ({})", status))),
        Err(_) => Err(Error::transport(format!("token verification failed: {}", status))),
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. All coordination
/// (retries, scheduling) is owned by `ReconciliationJob`.
pub struct CloudflareProvider {
    /// HTTP client carrying the Authorization header
    client: reqwest::Client,

    /// API base URL, without trailing slash
    api_base: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credential`: API token with Zone:Read and DNS:Edit permissions
    /// - `config`: endpoint and timeout settings
    ///
    /// # Errors
    ///
    /// - [`Error::CredentialInvalid`] if the token cannot be sent as a header
    /// - [`Error::Transport`] if the HTTP client cannot be built
    pub fn new(credential: &Credential, config: &ProviderConfig) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| Error::CredentialInvalid("token contains invalid characters".to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Send a request and unwrap the envelope
    async fn send<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<Envelope<T>> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{} failed reading response: {}", what, e)))?;

        if !status.is_success() {
            return Err(classify_failure(what, status, &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} failed: {}", what, envelope.error_list()),
            ));
        }

        Ok(envelope)
    }

    /// GET every page of a listing endpoint
    async fn get_all<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<Vec<T>> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let envelope: Envelope<Vec<T>> = self
                .send(
                    what,
                    self.client
                        .get(&url)
                        .query(&[("page", page), ("per_page", PER_PAGE)]),
                )
                .await?;

            items.extend(envelope.result.unwrap_or_default());

            if !has_next_page(page, envelope.result_info.as_ref()) {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /user/tokens/verify
    /// Authorization: Bearer <token>
    /// ```
    async fn verify_credential(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("user/tokens/verify"))
            .send()
            .await
            .map_err(|e| Error::transport(format!("token verification failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("token verification failed: {}", e)))?;

        interpret_verification(status, &body)
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        let zones: Vec<Zone> = self.get_all("listing zones", "zones").await?;
        tracing::debug!("Found {} zone(s)", zones.len());

        Ok(zones.into_iter().map(|zone| zone.id).collect())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RawRecord>> {
        let mut records: Vec<RawRecord> = self
            .get_all(
                &format!("listing records of zone {}", zone_id),
                &format!("zones/{}/dns_records", zone_id),
            )
            .await?;

        // Newer API responses no longer carry the zone id on each record
        for record in &mut records {
            if record.zone_id.is_empty() {
                record.zone_id = zone_id.to_string();
            }
        }

        Ok(records)
    }

    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// { "content": "1.2.3.4" }
    /// ```
    async fn patch_record_content(&self, zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        let url = self.url(&format!("zones/{}/dns_records/{}", zone_id, record_id));

        let _: Envelope<serde_json::Value> = self
            .send(
                &format!("patching record {} in zone {}", record_id, zone_id),
                self.client
                    .patch(&url)
                    .json(&serde_json::json!({ "content": content })),
            )
            .await?;

        tracing::debug!("Record {} in zone {} now points to {}", record_id, zone_id, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
