//! Asynchronous request dispatch with result delivery to a listener.
//!
//! # Design
//! `Dispatcher` pairs a `ParseClient` with a `Transport` and a registered
//! `ResultListener`. Reads go through `fetch`/`get`, which pick the URL by
//! `RequestKind`. The fire-and-forget operations (`fetch_by_id`,
//! `fetch_by_class`, `fetch_by_query`, `update`, `create`, `delete`) spawn one
//! task on the runtime captured at construction and return immediately; the
//! task calls the listener exactly once with either the decoded payload or a
//! typed error. The awaitable operations (`get_object`, `update_object`, ...)
//! run the same pipeline and hand the result straight back.
//!
//! The only shared state is the read-only client config, so concurrent
//! requests never interfere with each other.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::{ParseClient, RequestKind};
use crate::codec::ObjectPayload;
use crate::config::ParseConfig;
use crate::error::ParseError;
use crate::http::{HttpMethod, HttpRequest};
use crate::query::Query;
use crate::transport::{ReqwestTransport, Transport};

/// What a finished request was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: HttpMethod,
    pub kind: RequestKind,
    pub class_name: String,
    pub object_id: Option<String>,
}

/// Delivered to the listener once per dispatched request.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub request: RequestInfo,
    pub result: Result<ObjectPayload, ParseError>,
}

/// Receives the outcome of every fire-and-forget request.
pub trait ResultListener: Send + Sync + 'static {
    fn on_result(&self, outcome: RequestOutcome);
}

impl<F> ResultListener for F
where
    F: Fn(RequestOutcome) + Send + Sync + 'static,
{
    fn on_result(&self, outcome: RequestOutcome) {
        self(outcome)
    }
}

impl ResultListener for mpsc::UnboundedSender<RequestOutcome> {
    fn on_result(&self, outcome: RequestOutcome) {
        // Receiver gone means nobody is interested any more.
        let _ = self.send(outcome);
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<ParseClient>,
    transport: Arc<dyn Transport>,
    listener: Arc<dyn ResultListener>,
    runtime: Handle,
}

impl Dispatcher {
    /// Dispatcher backed by `ReqwestTransport`. Must be called from inside a
    /// tokio runtime; results are delivered on that runtime.
    pub fn new(config: &ParseConfig, listener: impl ResultListener) -> Result<Self, ParseError> {
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(config, transport, listener)
    }

    pub fn with_transport(
        config: &ParseConfig,
        transport: impl Transport,
        listener: impl ResultListener,
    ) -> Result<Self, ParseError> {
        let runtime = Handle::try_current()
            .map_err(|e| ParseError::Config(format!("dispatcher needs a tokio runtime: {e}")))?;
        Ok(Self {
            client: Arc::new(ParseClient::new(config)),
            transport: Arc::new(transport),
            listener: Arc::new(listener),
            runtime,
        })
    }

    pub fn client(&self) -> &ParseClient {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Fire-and-forget operations
    // -----------------------------------------------------------------------

    /// Fire a GET chosen by `kind`. `object_id` is required for
    /// `SingleObject`; a missing id reaches the listener as
    /// `ParseError::MissingObjectId`.
    pub fn fetch(
        &self,
        kind: RequestKind,
        class_name: &str,
        object_id: Option<&str>,
        query: Option<&Query>,
        include: &[String],
    ) -> JoinHandle<()> {
        let info = info(HttpMethod::Get, kind, class_name, object_id);
        let request = self
            .client
            .build_request(kind, class_name, object_id, query, include);
        self.spawn(info, request)
    }

    pub fn fetch_by_id(&self, class_name: &str, object_id: &str, include: &[String]) -> JoinHandle<()> {
        self.fetch(RequestKind::SingleObject, class_name, Some(object_id), None, include)
    }

    pub fn fetch_by_class(&self, class_name: &str, include: &[String]) -> JoinHandle<()> {
        self.fetch(RequestKind::Collection, class_name, None, None, include)
    }

    pub fn fetch_by_query(&self, class_name: &str, query: &Query) -> JoinHandle<()> {
        self.fetch(RequestKind::Query, class_name, None, Some(query), &[])
    }

    pub fn update(&self, class_name: &str, object_id: &str, values: &ObjectPayload) -> JoinHandle<()> {
        let info = info(HttpMethod::Put, RequestKind::SingleObject, class_name, Some(object_id));
        let request = self.client.build_update_object(class_name, object_id, values);
        self.spawn(info, request)
    }

    pub fn create(&self, class_name: &str, values: &ObjectPayload) -> JoinHandle<()> {
        let info = info(HttpMethod::Post, RequestKind::Collection, class_name, None);
        let request = self.client.build_create_object(class_name, values);
        self.spawn(info, request)
    }

    pub fn delete(&self, class_name: &str, object_id: &str) -> JoinHandle<()> {
        let info = info(HttpMethod::Delete, RequestKind::SingleObject, class_name, Some(object_id));
        let request = self.client.build_delete_object(class_name, object_id);
        self.spawn(info, Ok(request))
    }

    // -----------------------------------------------------------------------
    // Awaitable operations
    // -----------------------------------------------------------------------

    pub async fn get(
        &self,
        kind: RequestKind,
        class_name: &str,
        object_id: Option<&str>,
        query: Option<&Query>,
        include: &[String],
    ) -> Result<ObjectPayload, ParseError> {
        let request = self
            .client
            .build_request(kind, class_name, object_id, query, include)?;
        self.execute(request).await
    }

    pub async fn get_object(
        &self,
        class_name: &str,
        object_id: &str,
        include: &[String],
    ) -> Result<ObjectPayload, ParseError> {
        self.get(RequestKind::SingleObject, class_name, Some(object_id), None, include)
            .await
    }

    pub async fn get_collection(&self, class_name: &str, include: &[String]) -> Result<ObjectPayload, ParseError> {
        self.get(RequestKind::Collection, class_name, None, None, include).await
    }

    pub async fn query(&self, class_name: &str, query: &Query) -> Result<ObjectPayload, ParseError> {
        self.get(RequestKind::Query, class_name, None, Some(query), &[]).await
    }

    pub async fn update_object(
        &self,
        class_name: &str,
        object_id: &str,
        values: &ObjectPayload,
    ) -> Result<ObjectPayload, ParseError> {
        let request = self.client.build_update_object(class_name, object_id, values)?;
        self.execute(request).await
    }

    pub async fn create_object(&self, class_name: &str, values: &ObjectPayload) -> Result<ObjectPayload, ParseError> {
        let request = self.client.build_create_object(class_name, values)?;
        self.execute(request).await
    }

    pub async fn delete_object(&self, class_name: &str, object_id: &str) -> Result<ObjectPayload, ParseError> {
        let request = self.client.build_delete_object(class_name, object_id);
        self.execute(request).await
    }

    // -----------------------------------------------------------------------

    fn spawn(&self, info: RequestInfo, request: Result<HttpRequest, ParseError>) -> JoinHandle<()> {
        let this = self.clone();
        self.runtime.spawn(async move {
            let result = match request {
                Ok(request) => this.execute(request).await,
                Err(e) => {
                    warn!(class = %info.class_name, error = %e, "request could not be built");
                    Err(e)
                }
            };
            this.listener.on_result(RequestOutcome { request: info, result });
        })
    }

    async fn execute(&self, request: HttpRequest) -> Result<ObjectPayload, ParseError> {
        let method = request.method;
        let url = request.url.clone();
        debug!(method = method.as_str(), %url, "dispatching request");

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = method.as_str(), %url, error = %e, "transport failed");
                return Err(e);
            }
        };
        debug!(method = method.as_str(), %url, status = response.status, "response received");

        let result = self.client.parse_response(method, response);
        if let Err(e) = &result {
            warn!(method = method.as_str(), %url, error = %e, "request failed");
        }
        result
    }
}

fn info(method: HttpMethod, kind: RequestKind, class_name: &str, object_id: Option<&str>) -> RequestInfo {
    RequestInfo {
        method,
        kind,
        class_name: class_name.to_string(),
        object_id: object_id.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::Credentials;
    use crate::http::{HttpResponse, APPLICATION_ID_HEADER, REST_API_KEY_HEADER};

    const BASE: &str = "http://parse.test/1/classes";

    /// Records every request and answers from a table keyed by URL.
    #[derive(Clone, Default)]
    struct FakeTransport {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        replies: Arc<HashMap<String, Result<HttpResponse, ParseError>>>,
    }

    impl FakeTransport {
        fn with_replies(replies: Vec<(String, Result<HttpResponse, ParseError>)>) -> Self {
            Self {
                seen: Arc::default(),
                replies: Arc::new(replies.into_iter().collect()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ParseError> {
            let reply = self
                .replies
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Ok(ok(404, r#"{"code":101,"error":"object not found"}"#)));
            self.seen.lock().unwrap().push(request);
            reply
        }
    }

    fn ok(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn config() -> ParseConfig {
        ParseConfig::new(Credentials::new("app", "key")).with_server_url("http://parse.test/1")
    }

    fn dispatcher(transport: FakeTransport) -> (Dispatcher, mpsc::UnboundedReceiver<RequestOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::with_transport(&config(), transport, tx).unwrap(), rx)
    }

    #[tokio::test]
    async fn update_sends_one_put_with_credentials_and_body() {
        let transport = FakeTransport::with_replies(vec![(
            format!("{BASE}/Post/abc123"),
            Ok(ok(200, r#"{"updatedAt":"2015-10-13T00:00:00.000Z"}"#)),
        )]);
        let (d, mut rx) = dispatcher(transport.clone());

        let mut values = ObjectPayload::new();
        values.insert("content".to_string(), json!("hi"));
        d.update("Post", "abc123", &values).await.unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.request.method, HttpMethod::Put);
        assert_eq!(outcome.request.object_id.as_deref(), Some("abc123"));
        assert!(outcome.result.unwrap().contains_key("updatedAt"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, format!("{BASE}/Post/abc123"));
        assert_eq!(req.header(APPLICATION_ID_HEADER), Some("app"));
        assert_eq!(req.header(REST_API_KEY_HEADER), Some("key"));
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"content": "hi"}));
    }

    #[tokio::test]
    async fn fetch_by_class_without_include_has_no_query_string() {
        let transport =
            FakeTransport::with_replies(vec![(format!("{BASE}/Post"), Ok(ok(200, r#"{"results":[]}"#)))]);
        let (d, mut rx) = dispatcher(transport.clone());

        d.fetch_by_class("Post", &[]).await.unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.request.kind, RequestKind::Collection);
        assert_eq!(outcome.result.unwrap()["results"], json!([]));
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, format!("{BASE}/Post"));
    }

    #[tokio::test]
    async fn transport_error_reaches_listener_as_error() {
        let transport = FakeTransport::with_replies(vec![(
            format!("{BASE}/Post"),
            Err(ParseError::Transport("connection refused".to_string())),
        )]);
        let (d, mut rx) = dispatcher(transport);

        d.fetch_by_class("Post", &[]).await.unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(
            outcome.result.unwrap_err(),
            ParseError::Transport("connection refused".to_string())
        );
        assert!(rx.try_recv().is_err(), "listener must fire exactly once");
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error_not_panic() {
        let transport =
            FakeTransport::with_replies(vec![(format!("{BASE}/Post/x"), Ok(ok(200, "{not json")))]);
        let (d, mut rx) = dispatcher(transport);

        d.fetch_by_id("Post", "x", &[]).await.unwrap();

        let outcome = rx.recv().await.unwrap();
        assert!(matches!(outcome.result, Err(ParseError::Decode(_))));
    }

    #[tokio::test]
    async fn concurrent_fetches_do_not_cross_talk() {
        let transport = FakeTransport::with_replies(vec![
            (format!("{BASE}/Post/a"), Ok(ok(200, r#"{"objectId":"a"}"#))),
            (format!("{BASE}/Post/b"), Ok(ok(200, r#"{"objectId":"b"}"#))),
        ]);
        let (d, mut rx) = dispatcher(transport);

        let first = d.fetch_by_id("Post", "a", &[]);
        let second = d.fetch_by_id("Post", "b", &[]);
        first.await.unwrap();
        second.await.unwrap();

        for _ in 0..2 {
            let outcome = rx.recv().await.unwrap();
            let id = outcome.request.object_id.clone().unwrap();
            assert_eq!(outcome.result.unwrap()["objectId"], json!(id));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closure_listener_receives_outcome() {
        let seen: Arc<Mutex<Vec<RequestOutcome>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let transport = FakeTransport::default();
        let d = Dispatcher::with_transport(&config(), transport, move |o: RequestOutcome| {
            sink.lock().unwrap().push(o);
        })
        .unwrap();

        d.delete("Post", "gone").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].request.method, HttpMethod::Delete);
        assert_eq!(seen[0].result, Err(ParseError::NotFound));
    }

    #[tokio::test]
    async fn awaitable_get_object_returns_payload() {
        let transport = FakeTransport::with_replies(vec![(
            format!("{BASE}/Post/x?include=author"),
            Ok(ok(200, r#"{"objectId":"x","author":{"name":"jm"}}"#)),
        )]);
        let (d, _rx) = dispatcher(transport);

        let payload = d
            .get_object("Post", "x", &["author".to_string()])
            .await
            .unwrap();
        assert_eq!(payload["author"]["name"], "jm");
    }

    #[tokio::test]
    async fn fetch_single_object_without_id_reports_missing_id() {
        let transport = FakeTransport::default();
        let (d, mut rx) = dispatcher(transport.clone());

        d.fetch(RequestKind::SingleObject, "Post", None, None, &[])
            .await
            .unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.request.kind, RequestKind::SingleObject);
        assert_eq!(outcome.result.unwrap_err(), ParseError::MissingObjectId);
        assert!(transport.requests().is_empty(), "nothing may be sent");
    }

    #[tokio::test]
    async fn fetch_by_kind_picks_url() {
        let transport = FakeTransport::with_replies(vec![
            (format!("{BASE}/Post/x"), Ok(ok(200, r#"{"objectId":"x"}"#))),
            (format!("{BASE}/Post?include=author"), Ok(ok(200, r#"{"results":[]}"#))),
        ]);
        let (d, _rx) = dispatcher(transport.clone());

        d.get(RequestKind::SingleObject, "Post", Some("x"), None, &[])
            .await
            .unwrap();
        d.get(RequestKind::Collection, "Post", Some("ignored"), None, &["author".to_string()])
            .await
            .unwrap();
        let query = Query::new().equal_to("n", 1);
        let err = d
            .get(RequestKind::Query, "Post", None, Some(&query), &[])
            .await
            .unwrap_err();
        assert_eq!(err, ParseError::NotFound);

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls[0], format!("{BASE}/Post/x"));
        assert_eq!(urls[1], format!("{BASE}/Post?include=author"));
        assert!(urls[2].starts_with(&format!("{BASE}/Post?where=")));
    }

    #[test]
    fn construction_outside_runtime_is_config_error() {
        let (tx, _rx) = mpsc::unbounded_channel::<RequestOutcome>();
        let err = Dispatcher::with_transport(&config(), FakeTransport::default(), tx)
            .err()
            .unwrap();
        assert!(matches!(err, ParseError::Config(_)));
    }
}
