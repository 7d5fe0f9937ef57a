//! HTTP client wrapper for downstream services
//!
//! Every call yields exactly one [`ServiceResult`]. Network, status and body
//! failures are converted into error records here and never propagate.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::OrchestratorConfig;
use crate::models::{FailureKind, Payload, ServiceError, ServiceResult};
use crate::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// File attached to a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

/// A single downstream request
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub json: Option<Value>,
    pub files: Vec<FilePart>,
    pub expect_json: bool,
}

impl ServiceRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            form: Vec::new(),
            json: None,
            files: Vec::new(),
            expect_json: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    /// Return the body verbatim as bytes instead of decoding JSON
    pub fn raw(mut self) -> Self {
        self.expect_json = false;
        self
    }
}

/// Seam between the sequencer and the network
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn call(&self, request: ServiceRequest) -> ServiceResult;
}

/// Reusable HTTP client (connection-pooled)
pub struct HttpServiceClient {
    client: Client,
    get_timeout: Duration,
    post_timeout: Duration,
}

impl HttpServiceClient {
    pub fn new(get_timeout: Duration, post_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            get_timeout,
            post_timeout,
        })
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        Self::new(config.get_timeout, config.post_timeout)
    }

    fn build(&self, request: ServiceRequest) -> std::result::Result<RequestBuilder, ServiceError> {
        let ServiceRequest {
            method,
            url,
            params,
            form,
            json,
            files,
            ..
        } = request;

        let mut builder = match method {
            Method::Get => self.client.get(&url).timeout(self.get_timeout),
            Method::Post => self.client.post(&url).timeout(self.post_timeout),
        };

        if !params.is_empty() {
            builder = builder.query(&params);
        }

        if method == Method::Get {
            return Ok(builder);
        }

        if let Some(body) = json {
            builder = builder.json(&body);
        }

        if !files.is_empty() {
            let mut multipart = Form::new();
            for (key, value) in form {
                multipart = multipart.text(key, value);
            }
            for file in files {
                let mut part = Part::bytes(file.data).file_name(file.file_name);
                if let Some(mime) = file.mime_type {
                    part = part.mime_str(&mime).map_err(|e| {
                        ServiceError::new(
                            FailureKind::InvalidRequest,
                            format!("Invalid mime type '{}': {}", mime, e),
                            ServiceError::DEFAULT_STATUS,
                        )
                    })?;
                }
                multipart = multipart.part(file.field, part);
            }
            builder = builder.multipart(multipart);
        } else if !form.is_empty() {
            builder = builder.form(&form);
        }

        Ok(builder)
    }
}

#[async_trait]
impl ServiceClient for HttpServiceClient {
    async fn call(&self, request: ServiceRequest) -> ServiceResult {
        let started = Instant::now();
        let method = request.method;
        let url = request.url.clone();
        let expect_json = request.expect_json;

        debug!(%method, url = %url, "Calling service");

        let builder = match self.build(request) {
            Ok(builder) => builder,
            Err(err) => {
                error!(url = %url, error = %err.error, "Failed to build request");
                return ServiceResult::Failure(err);
            }
        };

        let response = match builder.send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                let (kind, status_code) = match e.status() {
                    Some(status) => (FailureKind::HttpStatus, status.as_u16()),
                    None => (FailureKind::Network, ServiceError::DEFAULT_STATUS),
                };
                error!(%method, url = %url, status_code, "Error calling service: {}", e);
                return ServiceResult::failure(kind, e.to_string(), status_code);
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(url = %url, "Failed to read response body: {}", e);
                return ServiceResult::failure(
                    FailureKind::Network,
                    e.to_string(),
                    ServiceError::DEFAULT_STATUS,
                );
            }
        };

        info!(
            %method,
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Service call completed"
        );

        if !expect_json {
            return ServiceResult::Success(Payload::Bytes(body.to_vec()));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => ServiceResult::Success(Payload::Json(value)),
            Err(e) => {
                warn!(
                    url = %url,
                    status = status.as_u16(),
                    "Failed to decode JSON, returning raw text: {}",
                    e
                );
                ServiceResult::Success(Payload::Text(
                    String::from_utf8_lossy(&body).into_owned(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Query},
        http::StatusCode,
        routing::{get, post},
        Form as AxumForm, Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_stub() -> String {
        let router = Router::new()
            .route("/json", get(|| async { Json(json!({"data": {"price": 10.5}})) }))
            .route("/text", get(|| async { "definitely not json" }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
            .route(
                "/echo-params",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!(params))
                }),
            )
            .route(
                "/echo-json",
                post(|Json(body): Json<Value>| async move { Json(json!({"received": body})) }),
            )
            .route(
                "/upload",
                post(|mut multipart: Multipart| async move {
                    let mut parts = Vec::new();
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let data = field.bytes().await.unwrap();
                        parts.push(json!({
                            "name": name,
                            "file_name": file_name,
                            "data": String::from_utf8_lossy(&data),
                        }));
                    }
                    Json(json!(parts))
                }),
            )
            .route(
                "/audio",
                post(|AxumForm(form): AxumForm<HashMap<String, String>>| async move {
                    form.get("text").cloned().unwrap_or_default().into_bytes()
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn client() -> HttpServiceClient {
        HttpServiceClient::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let base = spawn_stub().await;
        let result = client().call(ServiceRequest::get(format!("{}/json", base))).await;
        assert_eq!(result, ServiceResult::json(json!({"data": {"price": 10.5}})));
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back_to_text() {
        let base = spawn_stub().await;
        let result = client().call(ServiceRequest::get(format!("{}/text", base))).await;
        assert_eq!(
            result,
            ServiceResult::Success(Payload::Text("definitely not json".to_string()))
        );
    }

    #[tokio::test]
    async fn test_http_status_becomes_error_record() {
        let base = spawn_stub().await;
        let result = client()
            .call(ServiceRequest::get(format!("{}/missing", base)))
            .await;

        match result {
            ServiceResult::Failure(err) => {
                assert_eq!(err.status_code, 404);
                assert_eq!(err.kind, FailureKind::HttpStatus);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_defaults_to_500() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client()
            .call(ServiceRequest::get(format!("http://{}/json", addr)))
            .await;

        match result {
            ServiceResult::Failure(err) => {
                assert_eq!(err.status_code, 500);
                assert_eq!(err.kind, FailureKind::Network);
                assert!(!err.error.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_params_are_sent() {
        let base = spawn_stub().await;
        let result = client()
            .call(ServiceRequest::get(format!("{}/echo-params", base)).param("range", "1d"))
            .await;
        assert_eq!(result, ServiceResult::json(json!({"range": "1d"})));
    }

    #[tokio::test]
    async fn test_post_json_body() {
        let base = spawn_stub().await;
        let result = client()
            .call(ServiceRequest::post(format!("{}/echo-json", base)).json(json!({"top_k": 5})))
            .await;
        assert_eq!(result, ServiceResult::json(json!({"received": {"top_k": 5}})));
    }

    #[tokio::test]
    async fn test_raw_form_post_returns_bytes() {
        let base = spawn_stub().await;
        let result = client()
            .call(
                ServiceRequest::post(format!("{}/audio", base))
                    .form_field("text", "hello there")
                    .raw(),
            )
            .await;
        assert_eq!(result, ServiceResult::bytes(b"hello there".to_vec()));
    }

    fn report(contents: &str, mime_type: Option<&str>) -> FilePart {
        FilePart {
            field: "document".to_string(),
            file_name: "report.txt".to_string(),
            mime_type: mime_type.map(str::to_string),
            data: contents.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_multipart_sends_form_fields_and_files() {
        let base = spawn_stub().await;
        let result = client()
            .call(
                ServiceRequest::post(format!("{}/upload", base))
                    .form_field("ticker", "AAPL")
                    .file(report("10-K body", Some("text/plain"))),
            )
            .await;

        assert_eq!(
            result,
            ServiceResult::json(json!([
                {"name": "ticker", "file_name": null, "data": "AAPL"},
                {"name": "document", "file_name": "report.txt", "data": "10-K body"},
            ]))
        );
    }

    #[tokio::test]
    async fn test_invalid_mime_type_is_request_failure() {
        let result = client()
            .call(
                ServiceRequest::post("http://127.0.0.1:9/upload")
                    .file(report("body", Some("not-a-mime"))),
            )
            .await;

        match result {
            ServiceResult::Failure(err) => {
                assert_eq!(err.status_code, 500);
                assert_eq!(err.kind, FailureKind::InvalidRequest);
                assert!(err.error.contains("not-a-mime"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
