//! Stateless HTTP request builder and response parser for the Parse REST API.
//!
//! # Design
//! `ParseClient` holds only the URL builder and request factory and carries
//! no mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The `Dispatcher` (or any other caller) executes the
//! round-trip in between.

use serde::Deserialize;

use crate::codec::{self, ObjectPayload};
use crate::config::ParseConfig;
use crate::endpoint::UrlBuilder;
use crate::error::ParseError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestFactory};
use crate::query::Query;

/// Which kind of read a GET request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// One object by id. Requires an object id.
    SingleObject,
    /// Every object of a class.
    Collection,
    /// Objects of a class matching a `Query`.
    Query,
}

/// Body of a Parse error response, e.g. `{"code":101,"error":"object not found"}`.
#[derive(Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    error: String,
}

#[derive(Debug, Clone)]
pub struct ParseClient {
    urls: UrlBuilder,
    requests: RequestFactory,
}

impl ParseClient {
    pub fn new(config: &ParseConfig) -> Self {
        Self {
            urls: UrlBuilder::new(&config.classes_url()),
            requests: RequestFactory::new(config.credentials().clone()),
        }
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    /// Build a GET request for any `RequestKind`. `object_id` is only read for
    /// `SingleObject`, `query` only for `Query`; `include` applies to all three.
    pub fn build_request(
        &self,
        kind: RequestKind,
        class_name: &str,
        object_id: Option<&str>,
        query: Option<&Query>,
        include: &[String],
    ) -> Result<HttpRequest, ParseError> {
        match kind {
            RequestKind::SingleObject => {
                let id = object_id.ok_or(ParseError::MissingObjectId)?;
                Ok(self.build_get_object(class_name, id, include))
            }
            RequestKind::Collection => Ok(self.build_get_collection(class_name, include)),
            RequestKind::Query => {
                let mut query = query.cloned().unwrap_or_default();
                for field in include {
                    if !query.includes().contains(field) {
                        query = query.include(field);
                    }
                }
                Ok(self.build_query(class_name, &query))
            }
        }
    }

    pub fn build_get_object(&self, class_name: &str, object_id: &str, include: &[String]) -> HttpRequest {
        let url = self.urls.object_url_with_include(class_name, object_id, include);
        self.requests.build(url, HttpMethod::Get)
    }

    pub fn build_get_collection(&self, class_name: &str, include: &[String]) -> HttpRequest {
        let url = self.urls.collection_url(class_name, include);
        self.requests.build(url, HttpMethod::Get)
    }

    pub fn build_query(&self, class_name: &str, query: &Query) -> HttpRequest {
        let url = self.urls.query_url(class_name, query);
        self.requests.build(url, HttpMethod::Get)
    }

    pub fn build_update_object(
        &self,
        class_name: &str,
        object_id: &str,
        values: &ObjectPayload,
    ) -> Result<HttpRequest, ParseError> {
        let body = codec::encode(values)?;
        let url = self.urls.object_url(class_name, object_id);
        Ok(self.requests.build(url, HttpMethod::Put).with_body(body))
    }

    pub fn build_create_object(&self, class_name: &str, values: &ObjectPayload) -> Result<HttpRequest, ParseError> {
        let body = codec::encode(values)?;
        let url = self.urls.class_url(class_name);
        Ok(self.requests.build(url, HttpMethod::Post).with_body(body))
    }

    pub fn build_delete_object(&self, class_name: &str, object_id: &str) -> HttpRequest {
        let url = self.urls.object_url(class_name, object_id);
        self.requests.build(url, HttpMethod::Delete)
    }

    /// Parse the response to any GET built above.
    pub fn parse_fetch(&self, response: HttpResponse) -> Result<ObjectPayload, ParseError> {
        parse_payload(response, 200)
    }

    pub fn parse_update_object(&self, response: HttpResponse) -> Result<ObjectPayload, ParseError> {
        parse_payload(response, 200)
    }

    pub fn parse_create_object(&self, response: HttpResponse) -> Result<ObjectPayload, ParseError> {
        parse_payload(response, 201)
    }

    pub fn parse_delete_object(&self, response: HttpResponse) -> Result<ObjectPayload, ParseError> {
        parse_payload(response, 200)
    }

    /// Parse a response according to the method of the request that produced it.
    pub fn parse_response(&self, method: HttpMethod, response: HttpResponse) -> Result<ObjectPayload, ParseError> {
        match method {
            HttpMethod::Get => self.parse_fetch(response),
            HttpMethod::Put => self.parse_update_object(response),
            HttpMethod::Post => self.parse_create_object(response),
            HttpMethod::Delete => self.parse_delete_object(response),
        }
    }
}

fn parse_payload(response: HttpResponse, expected: u16) -> Result<ObjectPayload, ParseError> {
    check_status(&response, expected)?;
    codec::decode(Some(&response.body))
}

/// Map non-success status codes to the appropriate `ParseError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ParseError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ParseError::NotFound);
    }
    let (code, message) = match serde_json::from_slice::<ApiErrorBody>(&response.body) {
        Ok(body) => (body.code, body.error),
        Err(_) => (None, String::from_utf8_lossy(&response.body).into_owned()),
    };
    Err(ParseError::Api {
        status: response.status,
        code,
        message,
    })
}
