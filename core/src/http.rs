//! HTTP transport types and the request factory.
//!
//! # Design
//! Requests and responses are plain data. `ParseClient` builds `HttpRequest`
//! values and parses `HttpResponse` values; a `Transport` executes the actual
//! round-trip. `RequestFactory` is the only place requests are created, so
//! every outbound request carries both credential headers.

use crate::config::Credentials;

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
pub const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// First header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attach a JSON body along with its content type.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.headers
            .push((CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string()));
        self.body = Some(body);
        self
    }
}

/// An HTTP response described as plain data. `body` is empty when the
/// server sent none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Stamps the credential headers onto every request it builds.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    credentials: Credentials,
}

impl RequestFactory {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn build(&self, url: String, method: HttpMethod) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: vec![
                (
                    APPLICATION_ID_HEADER.to_string(),
                    self.credentials.application_id().to_string(),
                ),
                (
                    REST_API_KEY_HEADER.to_string(),
                    self.credentials.rest_api_key().to_string(),
                ),
            ],
            body: None,
        }
    }
}
