//! HTTP client shared by every iteration, with per-request tagging.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::trace::IterationTrace;

/// Request tags, one per kind of call an iteration makes.
pub mod tags {
    pub const HELPER_GET_CRYPTO: &str = "Helper_GetCrypto";
    pub const FULCIO_REQUEST_CERT: &str = "Fulcio_RequestCert";
    pub const REKOR_CREATE_HASHED_REKORD: &str = "Rekor_CreateHashedRekord";
    pub const HELPER_GET_TIMESTAMP: &str = "Helper_GetTimestamp";
    pub const REKOR_CREATE_RFC3161: &str = "Rekor_CreateRfc3161";
    pub const REKOR_GET_ENTRY: &str = "Rekor_GetEntryByUUID";
    pub const TSA_GET_CERT_CHAIN: &str = "TSA_GetCertChain";
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Wraps a pooled `reqwest::Client`. No retries are performed.
#[derive(Debug, Clone)]
pub struct TasClient {
    inner: reqwest::Client,
}

impl TasClient {
    /// Create a client with a per-request timeout.
    pub fn new(timeout: Duration, max_idle_per_host: usize) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { inner })
    }

    /// The underlying client, for calls whose responses are not inspected.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.inner.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.inner.post(url)
    }

    /// Send a request and buffer its body.
    pub async fn execute(&self, request: RequestBuilder) -> Result<HttpResponse, reqwest::Error> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Send a request and record it in `trace` under `tag`.
    pub async fn send(
        &self,
        trace: &mut IterationTrace,
        tag: &'static str,
        request: RequestBuilder,
    ) -> Result<HttpResponse, reqwest::Error> {
        let start = Instant::now();
        let result = self.execute(request).await;
        let status = result.as_ref().ok().map(HttpResponse::status);
        trace.record_request(tag, status, start.elapsed());
        result
    }
}
