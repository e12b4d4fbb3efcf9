//! Executes `HttpRequest` values over the network.
//!
//! `Transport` is the seam between the pure request/response core and real
//! I/O; `ReqwestTransport` is the production implementation and tests plug in
//! their own.

use async_trait::async_trait;

use crate::config::ParseConfig;
use crate::error::ParseError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform one round-trip. Non-2xx statuses are returned as data; only
    /// failures to complete the exchange are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ParseError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ParseConfig) -> Result<Self, ParseError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ParseError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ParseError> {
        let mut builder = self.http.request(to_reqwest(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ParseError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ParseError::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}
