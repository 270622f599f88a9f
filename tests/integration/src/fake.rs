//! In-process stand-in for the orchestration and object storage APIs.
//!
//! Requests carrying an `Action` query parameter are orchestration calls and
//! answer with JSON envelopes; everything else is treated as a path-style
//! object request (`/<bucket>/<key>`).

use std::collections::HashMap;
use std::convert::Infallible;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bucket handed out by `CreateStorageLocation`.
pub const STORAGE_BUCKET: &str = "elasticbeanstalk-us-east-1-000000000000";

/// Version the environment runs before any update.
pub const INITIAL_VERSION: &str = "v0";

/// How the environment reacts to an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollout {
    /// The new version comes up Ready and Green.
    Healthy,
    /// The update fails and the environment keeps the previous version.
    Failing,
}

/// One request as the fake received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// HTTP method.
    pub method: Method,
    /// Decoded request path.
    pub path: String,
    /// Orchestration action, if any.
    pub action: Option<String>,
    /// `host` header.
    pub host: Option<String>,
    /// `authorization` header.
    pub authorization: Option<String>,
}

#[derive(Debug)]
struct Environment {
    name: String,
    version_label: String,
    status: &'static str,
    health: &'static str,
}

#[derive(Debug)]
struct PlaneState {
    port: u16,
    rollout: Rollout,
    environment: Environment,
    versions: HashMap<String, Value>,
    objects: HashMap<String, Bytes>,
    // newest first, as the real API returns them
    events: Vec<Value>,
    throttles: HashMap<String, u32>,
    put_redirects: u32,
    gzip: bool,
    requests: Vec<SeenRequest>,
}

/// A fake control plane listening on an ephemeral local port.
///
/// The accept loop is aborted when the value is dropped.
#[derive(Debug)]
pub struct FakeControlPlane {
    addr: SocketAddr,
    state: Arc<Mutex<PlaneState>>,
    server: JoinHandle<()>,
}

impl FakeControlPlane {
    /// Bind to `127.0.0.1:0` and start serving an environment named
    /// `environment` that reacts to updates as `rollout` says.
    pub async fn start(environment: &str, rollout: Rollout) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind fake control plane")?;
        let addr = listener.local_addr()?;

        let state = Arc::new(Mutex::new(PlaneState {
            port: addr.port(),
            rollout,
            environment: Environment {
                name: environment.to_owned(),
                version_label: INITIAL_VERSION.to_owned(),
                status: "Ready",
                health: "Green",
            },
            versions: HashMap::new(),
            objects: HashMap::new(),
            events: Vec::new(),
            throttles: HashMap::new(),
            put_redirects: 0,
            gzip: false,
            requests: Vec::new(),
        }));

        let server = tokio::spawn(serve(listener, state.clone()));
        debug!(addr = %addr, "fake control plane listening");
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Endpoint override pointing at this server.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer the next `times` calls to `action` with a throttling error.
    pub fn throttle(&self, action: &str, times: u32) {
        self.state.lock().throttles.insert(action.to_owned(), times);
    }

    /// Redirect the next `times` object uploads to `localhost` on the same port.
    pub fn redirect_uploads(&self, times: u32) {
        self.state.lock().put_redirects = times;
    }

    /// Gzip every orchestration response body.
    pub fn gzip_responses(&self) {
        self.state.lock().gzip = true;
    }

    /// Register an application version as if it had been created earlier.
    pub fn register_version(&self, application: &str, label: &str) {
        let mut state = self.state.lock();
        let key = format!("{application}/{label}.zip");
        state
            .objects
            .insert(format!("{STORAGE_BUCKET}/{key}"), Bytes::from_static(b"old"));
        state.versions.insert(
            label.to_owned(),
            version_json(application, label, None, STORAGE_BUCKET, &key),
        );
    }

    /// Store an object directly.
    pub fn seed_object(&self, bucket: &str, key: &str, body: &'static [u8]) {
        self.state
            .lock()
            .objects
            .insert(format!("{bucket}/{key}"), Bytes::from_static(body));
    }

    /// Stored object body, if present.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state.lock().objects.get(&format!("{bucket}/{key}")).cloned()
    }

    /// Registered version, as the API would describe it.
    #[must_use]
    pub fn version(&self, label: &str) -> Option<Value> {
        self.state.lock().versions.get(label).cloned()
    }

    /// Version the environment currently runs.
    #[must_use]
    pub fn environment_version(&self) -> String {
        self.state.lock().environment.version_label.clone()
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of calls made to `action`.
    #[must_use]
    pub fn calls(&self, action: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.action.as_deref() == Some(action))
            .count()
    }
}

impl Drop for FakeControlPlane {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve(listener: TcpListener, state: Arc<Mutex<PlaneState>>) {
    let http = HttpConnBuilder::new(TokioExecutor::new());

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let state = state.clone();
        let service = service_fn(move |req| {
            let state = state.clone();
            async move { Ok::<_, Infallible>(handle(&state, req).await) }
        });
        let conn = http
            .serve_connection(TokioIo::new(stream), service)
            .into_owned();

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(peer_addr = %peer_addr, error = %e, "connection error");
            }
        });
    }
}

async fn handle(state: &Mutex<PlaneState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return error_response("IncompleteBody", &e.to_string()),
    };

    let query = parse_query(parts.uri.query().unwrap_or_default());
    let action = query.get("Action").cloned();
    let path = decode(parts.uri.path());
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    let mut state = state.lock();
    state.requests.push(SeenRequest {
        method: parts.method.clone(),
        path: path.clone(),
        action: action.clone(),
        host: header("host"),
        authorization: header("authorization"),
    });

    match action {
        Some(action) => state.orchestrate(&action, &query),
        None => state.storage(&parts.method, &path, body),
    }
}

impl PlaneState {
    fn orchestrate(&mut self, action: &str, query: &HashMap<String, String>) -> Response<Full<Bytes>> {
        if let Some(remaining) = self.throttles.get_mut(action) {
            if *remaining > 0 {
                *remaining -= 1;
                return error_response("Throttling", "Rate exceeded");
            }
        }

        let param = |name: &str| query.get(name).cloned().unwrap_or_default();
        match action {
            "CreateStorageLocation" => self.result(action, json!({ "S3Bucket": STORAGE_BUCKET })),
            "DescribeApplicationVersions" => {
                let label = param("VersionLabels.member.1");
                let versions: Vec<Value> = self.versions.get(&label).cloned().into_iter().collect();
                self.result(action, json!({ "ApplicationVersions": versions }))
            }
            "CreateApplicationVersion" => {
                let label = param("VersionLabel");
                let bucket = param("SourceBundle.S3Bucket");
                let key = param("SourceBundle.S3Key");
                if self.versions.contains_key(&label) {
                    return error_response(
                        "InvalidParameterValue",
                        &format!("Application Version {label} already exists."),
                    );
                }
                if !self.objects.contains_key(&format!("{bucket}/{key}")) {
                    return error_response(
                        "InvalidParameterCombination",
                        &format!("Unable to download from S3 location (Bucket: {bucket}, Key: {key})."),
                    );
                }
                let description = query.get("Description").map(String::as_str);
                let version = version_json(&param("ApplicationName"), &label, description, &bucket, &key);
                self.versions.insert(label, version.clone());
                self.result(action, json!({ "ApplicationVersion": version }))
            }
            "UpdateEnvironment" => self.update_environment(&param("EnvironmentName"), &param("VersionLabel")),
            "DescribeEvents" => {
                let events = self.events.clone();
                self.result(action, json!({ "Events": events }))
            }
            "DescribeEnvironments" => {
                let environments: Vec<Value> = if param("EnvironmentNames.member.1") == self.environment.name {
                    vec![json!({
                        "EnvironmentName": self.environment.name,
                        "VersionLabel": self.environment.version_label,
                        "Status": self.environment.status,
                        "Health": self.environment.health,
                    })]
                } else {
                    Vec::new()
                };
                self.result(action, json!({ "Environments": environments }))
            }
            _ => error_response("InvalidAction", &format!("Could not find operation {action}")),
        }
    }

    fn update_environment(&mut self, environment: &str, label: &str) -> Response<Full<Bytes>> {
        if environment != self.environment.name {
            return error_response(
                "InvalidParameterValue",
                &format!("No Environment found for EnvironmentName = '{environment}'."),
            );
        }
        if !self.versions.contains_key(label) {
            return error_response(
                "InvalidParameterValue",
                &format!("No Application Version named '{label}' found."),
            );
        }

        // Stamped ahead of the wall clock so the monitor cursor never drops them.
        let stamp = Utc::now() + TimeDelta::seconds(1);
        self.push_event(stamp, "INFO", "Environment update is starting.");
        match self.rollout {
            Rollout::Healthy => {
                label.clone_into(&mut self.environment.version_label);
                self.environment.status = "Ready";
                self.environment.health = "Green";
                self.push_event(
                    stamp + TimeDelta::milliseconds(10),
                    "INFO",
                    "Environment update completed successfully.",
                );
            }
            Rollout::Failing => {
                self.environment.status = "Ready";
                self.environment.health = "Grey";
                self.push_event(
                    stamp + TimeDelta::milliseconds(10),
                    "ERROR",
                    "Failed to deploy application.",
                );
                self.push_event(
                    stamp + TimeDelta::milliseconds(20),
                    "ERROR",
                    "Environment update completed unsuccessfully.",
                );
            }
        }

        let payload = json!({
            "EnvironmentName": self.environment.name,
            "VersionLabel": label,
            "Status": "Updating",
        });
        self.result("UpdateEnvironment", payload)
    }

    fn push_event(&mut self, date: DateTime<Utc>, severity: &str, message: &str) {
        #[allow(clippy::cast_precision_loss)]
        let epoch = date.timestamp_millis() as f64 / 1000.0;
        self.events.insert(
            0,
            json!({
                "EventDate": epoch,
                "Severity": severity,
                "Message": message,
                "EnvironmentName": self.environment.name,
            }),
        );
    }

    fn storage(&mut self, method: &Method, path: &str, body: Bytes) -> Response<Full<Bytes>> {
        let object_key = path.trim_start_matches('/').to_owned();
        match *method {
            Method::HEAD => {
                let status = if self.objects.contains_key(&object_key) {
                    StatusCode::OK
                } else {
                    StatusCode::NOT_FOUND
                };
                empty_response(status)
            }
            Method::PUT if self.put_redirects > 0 => {
                self.put_redirects -= 1;
                let mut response = empty_response(StatusCode::TEMPORARY_REDIRECT);
                if let Ok(location) = format!("http://localhost:{}{path}", self.port).parse() {
                    response.headers_mut().insert(LOCATION, location);
                }
                response
            }
            Method::PUT => {
                self.objects.insert(object_key, body);
                empty_response(StatusCode::OK)
            }
            _ => empty_response(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn result(&self, action: &str, payload: Value) -> Response<Full<Bytes>> {
        let mut response = Map::new();
        response.insert(format!("{action}Result"), payload);
        response.insert(
            "ResponseMetadata".to_owned(),
            json!({ "RequestId": format!("req-{}", self.requests.len()) }),
        );
        let mut envelope = Map::new();
        envelope.insert(format!("{action}Response"), Value::Object(response));

        let body = Bytes::from(Value::Object(envelope).to_string());
        if !self.gzip {
            return json_response(StatusCode::OK, body);
        }
        match gzip(&body) {
            Ok(compressed) => {
                let mut response = json_response(StatusCode::OK, compressed);
                response
                    .headers_mut()
                    .insert(CONTENT_ENCODING, http::HeaderValue::from_static("gzip"));
                response
            }
            Err(e) => error_response("InternalFailure", &e.to_string()),
        }
    }
}

fn version_json(
    application: &str,
    label: &str,
    description: Option<&str>,
    bucket: &str,
    key: &str,
) -> Value {
    json!({
        "ApplicationName": application,
        "VersionLabel": label,
        "Description": description,
        "Status": "UNPROCESSED",
        "SourceBundle": { "S3Bucket": bucket, "S3Key": key },
    })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn gzip(body: &[u8]) -> io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish().map(Bytes::from)
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn error_response(code: &str, message: &str) -> Response<Full<Bytes>> {
    let body = json!({ "Error": { "Type": "Sender", "Code": code, "Message": message } });
    json_response(StatusCode::BAD_REQUEST, Bytes::from(body.to_string()))
}
