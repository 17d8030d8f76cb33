use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::AnalyzerConfig;
use crate::models::{AnalysisRequest, AnalysisResult, AnalysisSummary, CreatedAnalysis};

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("analyzer request timed out")]
    Timeout,
    #[error("analyzer request failed: {0}")]
    Transport(String),
    #[error("analysis not found")]
    NotFound,
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("analyzer returned an invalid payload: {0}")]
    InvalidPayload(String),
    #[error("no identifier received from the server")]
    MissingIdentifier,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// The external analyzer service, treated as an opaque HTTP API.
pub trait AnalyzerApi: Send + Sync {
    fn create_analysis<'a>(&'a self, request: AnalysisRequest) -> ApiFuture<'a, CreatedAnalysis>;
    fn fetch_analysis<'a>(&'a self, id: &'a str) -> ApiFuture<'a, AnalysisResult>;
    fn list_analyses<'a>(&'a self) -> ApiFuture<'a, Vec<AnalysisSummary>>;
}

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("failed to build analyzer http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct HttpAnalyzerClient {
    client: reqwest::Client,
    create_url: String,
    fetch_url_base: String,
    list_url: String,
}

impl HttpAnalyzerClient {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, ClientBuildError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ClientBuildError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            create_url: config.create_url.clone(),
            fetch_url_base: config.fetch_url_base(),
            list_url: config.list_url(),
        })
    }

    fn fetch_url(&self, id: &str) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.fetch_url_base)
            .map_err(|err| ApiError::Transport(format!("invalid analyzer url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("analyzer url cannot take a path".to_string()))?
            .push(id);
        Ok(url.into())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        target: &str,
    ) -> Result<T, ApiError> {
        debug!(target_url = target, "sending analyzer request");

        let response = request.send().await.map_err(|err| {
            warn!(target_url = target, "analyzer request failed: {err}");
            if err.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::InvalidPayload(format!("response body read failed: {err}"))
            }
        })?;

        if !status.is_success() {
            warn!(
                target_url = target,
                status = status.as_u16(),
                "analyzer returned an error status"
            );
            return Err(status_error(status, &body));
        }

        serde_json::from_str::<T>(&body)
            .map_err(|err| ApiError::InvalidPayload(format!("response json parse failed: {err}")))
    }
}

impl AnalyzerApi for HttpAnalyzerClient {
    fn create_analysis<'a>(&'a self, request: AnalysisRequest) -> ApiFuture<'a, CreatedAnalysis> {
        Box::pin(async move {
            let builder = self.client.post(&self.create_url).json(&request);
            self.send_json(builder, &self.create_url).await
        })
    }

    fn fetch_analysis<'a>(&'a self, id: &'a str) -> ApiFuture<'a, AnalysisResult> {
        Box::pin(async move {
            let url = self.fetch_url(id)?;
            let builder = self.client.get(&url);
            self.send_json(builder, &url).await
        })
    }

    fn list_analyses<'a>(&'a self) -> ApiFuture<'a, Vec<AnalysisSummary>> {
        Box::pin(async move {
            let builder = self.client.get(&self.list_url);
            self.send_json(builder, &self.list_url).await
        })
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }

    let message = parse_error_message(body)
        .unwrap_or_else(|| format!("HTTP error! Status: {}", status.as_u16()));

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        message: Option<Value>,
        error: Option<Value>,
    }

    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok()?;
    let candidate = envelope.message.or_else(|| match envelope.error? {
        Value::Object(mut details) => details.remove("message"),
        other => Some(other),
    })?;

    match candidate {
        Value::String(message) if !message.trim().is_empty() => Some(message),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = status_error(StatusCode::NOT_FOUND, "{\"message\":\"gone\"}");
        assert!(err.is_not_found());
    }

    #[test]
    fn status_error_prefers_body_message() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            "{\"message\":\"url is required\"}",
        );
        assert_eq!(
            err,
            ApiError::Status {
                status: 400,
                message: "url is required".to_string()
            }
        );
        assert_eq!(err.to_string(), "url is required");
    }

    #[test]
    fn status_error_reads_nested_error_message() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "{\"error\":{\"message\":\"model overloaded\"}}",
        );
        assert_eq!(err.to_string(), "model overloaded");
    }

    #[test]
    fn status_error_falls_back_to_status_code() {
        let err = status_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(err.to_string(), "HTTP error! Status: 502");
    }

    #[test]
    fn fetch_url_escapes_id_as_single_segment() {
        let client = HttpAnalyzerClient {
            client: reqwest::Client::new(),
            create_url: "http://localhost:9000/web-analyzer/".to_string(),
            fetch_url_base: "http://localhost:9000/web-analyzer".to_string(),
            list_url: "http://localhost:9000/web-analyzer/".to_string(),
        };

        assert_eq!(
            client.fetch_url("abc123").expect("url should build"),
            "http://localhost:9000/web-analyzer/abc123"
        );
        assert_eq!(
            client.fetch_url("a/b c").expect("url should build"),
            "http://localhost:9000/web-analyzer/a%2Fb%20c"
        );
    }
}
