use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Capability, Payload, ScoringClient, ScoringError};
use crate::config::ScoringConfig;

/// JSON-over-HTTP client for the ML scoring service.
pub struct HttpScoringClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpScoringClient {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ScoringError::Request(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    fn url(&self, capability: Capability) -> String {
        format!("{}/{}", self.base_url, capability.endpoint())
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> ScoringError {
        if err.is_timeout() {
            ScoringError::Timeout {
                seconds: self.timeout.as_secs_f64(),
            }
        } else if err.is_connect() {
            ScoringError::Connect {
                url: url.to_string(),
            }
        } else {
            ScoringError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn invoke(&self, capability: Capability, body: &Value) -> Result<Payload, ScoringError> {
        let url = self.url(capability);
        debug!(url = %url, capability = capability.label(), "calling scoring service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.transport_error(&url, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(&url, err))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(payload)) => Ok(payload),
            Ok(other) => Err(ScoringError::Decode(format!(
                "expected a JSON object, got {other}"
            ))),
            Err(err) => Err(ScoringError::Decode(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::document_analysis::scoring::ScoringErrorKind;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server runs");
        });
        format!("http://{addr}")
    }

    fn client(base_url: String, timeout: Duration) -> HttpScoringClient {
        HttpScoringClient::new(&ScoringConfig {
            base_url,
            timeout,
            include_raw_text: false,
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn posts_body_to_capability_endpoint() {
        let router = Router::new().route(
            "/crossverify",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "overall_score": 0.9,
                    "echo": body["document_ids"],
                }))
            }),
        );
        let base_url = serve(router).await;

        let payload = client(format!("{base_url}/"), Duration::from_secs(5))
            .invoke(Capability::CrossVerify, &json!({ "document_ids": ["doc-7"] }))
            .await
            .expect("crossverify succeeds");

        assert_eq!(payload["overall_score"], 0.9);
        assert_eq!(payload["echo"], json!(["doc-7"]));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_body() {
        let router = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "age missing") }),
        );
        let base_url = serve(router).await;

        let err = client(base_url, Duration::from_secs(5))
            .invoke(Capability::Risk, &json!({}))
            .await
            .expect_err("422 surfaces as error");

        assert_eq!(err.kind(), ScoringErrorKind::Status(422));
        assert_eq!(err.to_string(), "ML API HTTP error: 422 - age missing");
    }

    #[tokio::test]
    async fn missing_endpoint_is_a_status_error() {
        let base_url = serve(Router::new()).await;

        let err = client(base_url, Duration::from_secs(5))
            .invoke(Capability::Compliance, &json!({}))
            .await
            .expect_err("404 surfaces as error");

        assert_eq!(err.kind(), ScoringErrorKind::Status(404));
    }

    #[tokio::test]
    async fn non_object_response_is_a_decode_error() {
        let router = Router::new().route("/predict", post(|| async { Json(json!([1, 2, 3])) }));
        let base_url = serve(router).await;

        let err = client(base_url, Duration::from_secs(5))
            .invoke(Capability::Risk, &json!({}))
            .await
            .expect_err("array payload rejected");

        assert_eq!(err.kind(), ScoringErrorKind::Decode);
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe listener");
        let addr = listener.local_addr().expect("probe address");
        drop(listener);

        let err = client(format!("http://{addr}"), Duration::from_secs(5))
            .invoke(Capability::Risk, &json!({}))
            .await
            .expect_err("nothing listening");

        assert_eq!(err.kind(), ScoringErrorKind::Connect);
        assert_eq!(
            err.to_string(),
            format!("Cannot connect to ML API at http://{addr}/predict")
        );
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/compliance",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );
        let base_url = serve(router).await;

        let err = client(base_url, Duration::from_millis(200))
            .invoke(Capability::Compliance, &json!({}))
            .await
            .expect_err("request exceeds timeout");

        assert_eq!(err.kind(), ScoringErrorKind::Timeout);
        assert_eq!(err.to_string(), "ML API timeout after 0.2 seconds");
    }
}
