use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::models::{
    ApiError, ErrorResponse, FtBalance, MergeRequest, MergeResponse, PurseMergeRequest, TransferReceipt,
    TransferRequestBody, UtxoCountRequest, UtxoCountResponse,
};
use super::{FtManager, FtManagerFactory, SessionParams};
use crate::config::FtApiConfig;
use crate::models::{Credential, Network, Receiver};
use crate::utils::ratelimit::{self, RateLimiter};

/// HTTP client for the FT management service
///
/// Cheap to clone; clones share the connection pool and the rate limiter.
#[derive(Clone)]
pub struct FtApiClient {
    http_client: HttpClient,
    api_token: Option<String>,
    base_url: String,
    limiter: Arc<Mutex<RateLimiter>>,
}

impl FtApiClient {
    pub fn new(config: &FtApiConfig) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::RequestError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_token: config.api_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(Mutex::new(RateLimiter::new(config.rate_limit))),
        })
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.api_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::RequestError(format!("Failed to create auth header: {}", e)))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        ratelimit::acquire(&self.limiter).await;

        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client
            .post(&url)
            .headers(self.create_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::read_response(response).await
    }

    async fn read_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body_text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// GET /contract/ft/address/{address}/balance
    ///
    /// Lists every token the address holds, with its UTXO count.
    pub async fn balances(&self, network: Network, address: &str) -> Result<Vec<FtBalance>, ApiError> {
        ratelimit::acquire(&self.limiter).await;

        let url = format!("{}/contract/ft/address/{}/balance", self.base_url, address);
        let response = self.http_client
            .get(&url)
            .headers(self.create_headers()?)
            .query(&[("network", network.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::read_response(response).await
    }
}

/// Turn a non-2xx response body into an [`ApiError`]
///
/// A `{code, message}` body is the service reporting its own failure and is
/// passed through; anything else keeps the HTTP status.
pub fn error_from_body(status: u16, body_text: &str) -> ApiError {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body_text) {
        if let Some(code) = err.code {
            return ApiError::Rejected {
                code,
                message: err.message.unwrap_or_else(|| format!("HTTP {}", status)),
            };
        }
        if let Some(message) = err.message {
            return ApiError::HttpError(status, message);
        }
    }

    if status == 429 || status >= 500 {
        warn!("FT service returned {}: {}", status, body_text);
    }
    ApiError::HttpError(status, body_text.to_string())
}

impl FtManagerFactory for FtApiClient {
    fn session(&self, params: SessionParams) -> Result<Box<dyn FtManager>, ApiError> {
        Ok(Box::new(FtSession {
            client: self.clone(),
            params,
        }))
    }
}

/// One invocation's view of the FT service: network, purse and fee rate fixed
pub struct FtSession {
    client: FtApiClient,
    params: SessionParams,
}

#[async_trait]
impl FtManager for FtSession {
    async fn merge_purse(&self, max_unspents: u64) -> Result<Option<String>, ApiError> {
        let body = PurseMergeRequest {
            network: self.params.network,
            purse: self.params.purse.expose(),
            feeb: self.params.feeb,
            max_unspents,
        };
        let response: MergeResponse = self.client.post_json("/purse/merge", &body).await?;
        Ok(response.txid)
    }

    async fn merge(&self, codehash: &str, genesis: &str, owner: &Credential) -> Result<(), ApiError> {
        let body = MergeRequest {
            network: self.params.network,
            purse: self.params.purse.expose(),
            feeb: self.params.feeb,
            codehash,
            genesis,
            owner_wif: owner.expose(),
        };
        let response: MergeResponse = self.client.post_json("/ft/merge", &body).await?;
        if let Some(txid) = response.txid {
            tracing::debug!("merge broadcast: {}", txid);
        }
        Ok(())
    }

    async fn transfer(
        &self,
        codehash: &str,
        genesis: &str,
        receivers: &[Receiver],
        sender: &Credential,
    ) -> Result<TransferReceipt, ApiError> {
        let body = TransferRequestBody {
            network: self.params.network,
            purse: self.params.purse.expose(),
            feeb: self.params.feeb,
            codehash,
            genesis,
            receivers,
            sender_wif: sender.expose(),
        };
        self.client.post_json("/ft/transfer", &body).await
    }

    async fn utxo_count(&self, codehash: &str, genesis: &str, owner: &Credential) -> Result<u64, ApiError> {
        let body = UtxoCountRequest {
            network: self.params.network,
            codehash,
            genesis,
            owner_wif: owner.expose(),
        };
        let response: UtxoCountResponse = self.client.post_json("/ft/utxo-count", &body).await?;
        Ok(response.utxo_count)
    }
}
