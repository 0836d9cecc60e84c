//! Lake Client - HTTP access to the lake service
//!
//! The `LakeEngine` trait is the only seam the pipeline talks to. `LakeClient`
//! implements it against the lake's REST API:
//! - POST /query?ctrl=true with `{"query": ...}`, answered as ZJSON
//! - GET /pool for pool enumeration
//! - GET /version for the connectivity self-test

use crate::config::LakeConfig;
use crate::error::{DatasourceError, Result};
use crate::lake::types::LakeType;
use crate::lake::zjson::Decoder;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const ZJSON: &str = "application/x-zjson";

/// Decoded query result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// Result values in engine order
    pub records: Vec<Value>,
    /// Distinct value types, in the order first seen
    pub shapes: Vec<LakeType>,
}

/// Operations the pipeline needs from the lake
#[async_trait]
pub trait LakeEngine: Send + Sync {
    /// Base URL, used in user-facing messages
    fn url(&self) -> &str;

    /// Run a query to completion
    async fn query(&self, query: &str) -> Result<QueryResponse>;

    /// Names of the pools in the lake
    async fn pools(&self) -> Result<Vec<String>>;

    /// Version string reported by the service
    async fn version(&self) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct PoolConfig {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Lake service client
///
/// One client (and its connection pool) is shared by every target of a request.
#[derive(Debug, Clone)]
pub struct LakeClient {
    base_url: String,
    client: Client,
}

impl LakeClient {
    pub fn new(config: &LakeConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| DatasourceError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.clone(),
            client,
        })
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.message)
            .unwrap_or(text);

        if status.is_client_error() {
            // the lake reports bad queries and unknown pools as 4xx
            Err(DatasourceError::Engine(message))
        } else {
            Err(DatasourceError::transport(
                &self.base_url,
                format!("status {}: {}", status, message),
            ))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DatasourceError::transport(&self.base_url, e))?;

        self.check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DatasourceError::transport(&self.base_url, e))
    }
}

#[async_trait]
impl LakeEngine for LakeClient {
    fn url(&self) -> &str {
        &self.base_url
    }

    async fn query(&self, query: &str) -> Result<QueryResponse> {
        info!("Submitting lake query: {}", query);
        let url = format!("{}/query?ctrl=true", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, ZJSON)
            .json(&QueryRequest { query })
            .send()
            .await
            .map_err(|e| DatasourceError::transport(&self.base_url, e))?;

        let body = self
            .check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| DatasourceError::transport(&self.base_url, e))?;

        let decoded = Decoder::new().decode_stream(&body)?;
        debug!(
            "Lake query returned {} records in {} shape(s)",
            decoded.records.len(),
            decoded.shapes.len()
        );
        Ok(decoded)
    }

    async fn pools(&self) -> Result<Vec<String>> {
        // an empty lake answers with null
        let pools: Option<Vec<PoolConfig>> = self.get_json("/pool").await?;
        Ok(pools.unwrap_or_default().into_iter().map(|p| p.name).collect())
    }

    async fn version(&self) -> Result<String> {
        let info: VersionResponse = self.get_json("/version").await?;
        Ok(info.version)
    }
}
