//! In-process mock of the identity issuer, helper, Fulcio, Rekor and TSA.
//!
//! All services share one axum server on an ephemeral localhost port, so a
//! single base URL serves as issuer, helper, Fulcio, Rekor and TSA URL at
//! once. Each [`Route`] answers with a programmable [`MockResponse`] and every
//! request, matched or not, is appended to a journal for later inspection.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::fixtures;

/// Endpoints served by the mock stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `POST /protocol/openid-connect/token`
    Token,
    /// `GET /generate-payloads`
    GeneratePayloads,
    /// `POST /get-timestamp`
    GetTimestamp,
    /// `POST /report-error`
    ReportError,
    /// `POST /api/v1/signingCert`
    SigningCert,
    /// `POST /api/v1/log/entries`
    CreateEntry,
    /// `GET /api/v1/log/entries/{uuid}`
    GetEntry,
    /// `GET /certchain`
    CertChain,
}

impl Route {
    fn resolve(method: &Method, path: &str) -> Option<Self> {
        const ENTRY_PREFIX: &str = "/api/v1/log/entries/";

        match (method.as_str(), path) {
            ("POST", "/protocol/openid-connect/token") => Some(Route::Token),
            ("GET", "/generate-payloads") => Some(Route::GeneratePayloads),
            ("POST", "/get-timestamp") => Some(Route::GetTimestamp),
            ("POST", "/report-error") => Some(Route::ReportError),
            ("POST", "/api/v1/signingCert") => Some(Route::SigningCert),
            ("POST", "/api/v1/log/entries") => Some(Route::CreateEntry),
            ("GET", p) if p.starts_with(ENTRY_PREFIX) && p.len() > ENTRY_PREFIX.len() => {
                Some(Route::GetEntry)
            }
            ("GET", "/certchain") => Some(Route::CertChain),
            _ => None,
        }
    }
}

/// A canned response for one route.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Wait this long before answering.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Empty body with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::status(status)
            .with_header("content-type", "text/plain")
            .with_body(body.into())
    }

    pub fn bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self::status(status)
            .with_header("content-type", "application/octet-stream")
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// A request received by the mock stack.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// `None` when no route matched (answered with 404).
    pub route: Option<Route>,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON. Panics if it is not.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    /// A decoded field of an `application/x-www-form-urlencoded` body.
    pub fn form_field(&self, name: &str) -> Option<String> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.body).ok()?;
        lookup(pairs, name)
    }

    /// A decoded query string parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(self.query.as_deref()?).ok()?;
        lookup(pairs, name)
    }
}

fn lookup(pairs: Vec<(String, String)>, name: &str) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

#[derive(Debug)]
struct MockState {
    responses: Mutex<HashMap<Route, MockResponse>>,
    /// Answered once each, in order, before falling back to `responses`.
    queued: Mutex<HashMap<Route, VecDeque<MockResponse>>>,
    journal: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    fn with_defaults() -> Self {
        let entry_response = fixtures::log_entry_response(
            fixtures::ENTRY_UUID,
            &fixtures::encode_entry_body(&fixtures::hashedrekord_body()),
        );

        let responses = HashMap::from([
            (
                Route::Token,
                MockResponse::json(
                    200,
                    &json!({"access_token": fixtures::ACCESS_TOKEN, "token_type": "Bearer"}),
                ),
            ),
            (
                Route::GeneratePayloads,
                MockResponse::json(200, &fixtures::crypto_bundle_json()),
            ),
            (
                Route::GetTimestamp,
                MockResponse::bytes(200, fixtures::TIMESTAMP_TOKEN),
            ),
            (Route::ReportError, MockResponse::status(200)),
            (
                Route::SigningCert,
                MockResponse::status(201)
                    .with_header("content-type", "application/pem-certificate-chain")
                    .with_body(fixtures::fulcio_chain_body()),
            ),
            (
                Route::CreateEntry,
                MockResponse::json(201, &entry_response)
                    .with_header("location", fixtures::ENTRY_LOCATION),
            ),
            (Route::GetEntry, MockResponse::json(200, &entry_response)),
            (
                Route::CertChain,
                MockResponse::status(200)
                    .with_header("content-type", "application/pem-certificate-chain")
                    .with_body(fixtures::fulcio_chain_body()),
            ),
        ]);

        Self {
            responses: Mutex::new(responses),
            queued: Mutex::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    fn next_response(&self, route: Route) -> Option<MockResponse> {
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| self.responses.lock().unwrap().get(&route).cloned())
    }
}

/// A running mock stack. The server stops when this is dropped.
#[derive(Debug)]
pub struct MockStack {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockStack {
    /// Start a stack answering every route with a successful default response.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("failed to bind mock listener");
        let addr = listener.local_addr().expect("mock listener has no address");

        let state = Arc::new(MockState::with_defaults());
        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL usable for every service of the stack.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the response of a route.
    pub fn respond(&self, route: Route, response: MockResponse) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(route, response);
    }

    /// Answer the next request to `route` with `response`, then go back to
    /// the route's regular response. Repeated calls queue up in order.
    pub fn respond_once(&self, route: Route, response: MockResponse) {
        self.state
            .queued
            .lock()
            .unwrap()
            .entry(route)
            .or_default()
            .push_back(response);
    }

    /// Every request received so far, in arrival order.
    pub fn journal(&self) -> Vec<RecordedRequest> {
        self.state.journal.lock().unwrap().clone()
    }

    pub fn requests_to(&self, route: Route) -> Vec<RecordedRequest> {
        self.journal()
            .into_iter()
            .filter(|r| r.route == Some(route))
            .collect()
    }

    pub fn count(&self, route: Route) -> usize {
        self.requests_to(route).len()
    }

    /// Routes of all received requests, in arrival order.
    pub fn route_sequence(&self) -> Vec<Option<Route>> {
        self.journal().iter().map(|r| r.route).collect()
    }

    /// Poll until `route` has received at least `count` requests.
    pub async fn wait_for(&self, route: Route, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(route) >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockStack {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = Route::resolve(&method, uri.path());
    state.journal.lock().unwrap().push(RecordedRequest {
        route,
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let response = route.and_then(|route| state.next_response(route));
    let Some(response) = response else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }
    response.into_response()
}
