//! Scripted [`HttpSender`] for tests.
//!
//! Responses are queued per route. A route is the `Action` query parameter of
//! an orchestration call, or the HTTP method (`HEAD`, `PUT`) of an object
//! storage call. The last queued response of a route is sticky: it keeps
//! answering once the queue is drained.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::error::TransportError;
use crate::sender::HttpSender;

/// A response template that can be replayed.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    failure: Option<String>,
}

impl CannedResponse {
    /// Empty body with `status`.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            failure: None,
        }
    }

    /// JSON body with `status`.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// 200 with the `<op>Response.<op>Result` envelope around `result`.
    #[must_use]
    pub fn result(operation: &str, result: Value) -> Self {
        let mut response = Map::new();
        response.insert(format!("{operation}Result"), result);
        response.insert(
            "ResponseMetadata".to_owned(),
            json!({ "RequestId": "00000000-0000-0000-0000-000000000000" }),
        );
        let mut body = Map::new();
        body.insert(format!("{operation}Response"), Value::Object(response));
        Self::json(200, &Value::Object(body))
    }

    /// Structured `{Error:{Code,Message}}` failure.
    #[must_use]
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::json(
            status,
            &json!({ "Error": { "Code": code, "Message": message, "Type": "Sender" } }),
        )
    }

    /// A rate-limit rejection.
    #[must_use]
    pub fn throttled() -> Self {
        Self::error(400, "Throttling", "Rate exceeded")
    }

    /// A 301 pointing at `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::status(301).with_header("location", location)
    }

    /// A transport failure instead of a response.
    #[must_use]
    pub fn failure(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::status(0)
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn to_response(&self) -> Result<http::Response<Bytes>, TransportError> {
        if let Some(message) = &self.failure {
            return Err(TransportError::new(message.clone()));
        }
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(self.body.clone())
            .map_err(|e| TransportError::with_source("invalid canned response", e))
    }
}

/// A request as the sender saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Route the request was matched on.
    pub route: String,
    /// HTTP method.
    pub method: http::Method,
    /// Full request URI.
    pub uri: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Value of query parameter `name`, still percent-encoded.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        query_param(&self.uri, name)
    }

    /// Header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<String, VecDeque<CannedResponse>>,
    requests: Vec<RecordedRequest>,
}

/// [`HttpSender`] answering from per-route queues and recording every request.
#[derive(Debug, Default)]
pub struct ScriptedSender {
    script: Mutex<Script>,
}

impl ScriptedSender {
    /// An empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for `route`.
    pub fn push(&self, route: &str, response: CannedResponse) -> &Self {
        self.script
            .lock()
            .routes
            .entry(route.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    /// Every request sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    /// Requests sent on `route`, in order.
    #[must_use]
    pub fn requests_for(&self, route: &str) -> Vec<RecordedRequest> {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.route == route)
            .cloned()
            .collect()
    }

    /// Number of requests sent on `route`.
    #[must_use]
    pub fn count(&self, route: &str) -> usize {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.route == route)
            .count()
    }
}

#[async_trait]
impl HttpSender for ScriptedSender {
    async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let uri = parts.uri.to_string();
        let route =
            query_param(&uri, "Action").unwrap_or_else(|| parts.method.as_str().to_owned());

        let mut script = self.script.lock();
        script.requests.push(RecordedRequest {
            route: route.clone(),
            method: parts.method,
            uri,
            headers: parts.headers,
            body,
        });

        let canned = match script.routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        drop(script);

        canned
            .ok_or_else(|| TransportError::new(format!("no scripted response for {route}")))?
            .to_response()
    }
}

fn query_param(uri: &str, name: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then(|| value.to_owned())
    })
}
