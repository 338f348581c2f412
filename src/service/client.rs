use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};

use super::GenerationService;
use super::error::ServiceError;
use super::types::{PendingJob, StepResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// HTTP implementation of [`GenerationService`].
///
/// Endpoints, relative to `base_url`:
/// - `POST /generation/{job_id}/advance`
/// - `POST /generation/{job_id}/cancel`
/// - `GET  /generation/pending?user_id={user_id}`
pub struct HttpGenerationService {
    api_key: String,
    client: Client,
    base_url: String,
}

impl HttpGenerationService {
    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ServiceError> {
        // A single step runs one model call on the server, so allow it time.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.authorized(req).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(1000);
            return Err(ServiceError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

impl GenerationService for HttpGenerationService {
    async fn advance(&self, job_id: &str) -> Result<StepResult, ServiceError> {
        let url = format!("{}/generation/{job_id}/advance", self.base_url);
        let response = self.send(self.client.post(url)).await?;
        Ok(response.json::<StepResult>().await?)
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        let url = format!("{}/generation/{job_id}/cancel", self.base_url);
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn list_pending(&self, user_id: &str) -> Result<Vec<PendingJob>, ServiceError> {
        let url = format!("{}/generation/pending", self.base_url);
        let req = self.client.get(url).query(&[("user_id", user_id)]);
        let response = self.send(req).await?;
        Ok(response.json::<Vec<PendingJob>>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpGenerationService {
        HttpGenerationService::with_base_url("sk-test".into(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn advance_parses_step() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generation/sim1/advance"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "geradas": 3,
                "erros": 0,
                "itemAtual": {"disciplina": "Matemática", "ordem": 4},
                "concluido": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let step = service(&server).advance("sim1").await.unwrap();
        assert_eq!(step.geradas, 3);
        assert_eq!(step.item_atual.unwrap().disciplina, "Matemática");
        assert!(!step.concluido);
    }

    #[tokio::test]
    async fn rate_limit_maps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generation/sim1/advance"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = service(&server).advance("sim1").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RateLimited {
                retry_after_ms: 7000
            }
        ));
    }

    #[tokio::test]
    async fn huge_retry_after_saturates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generation/sim1/advance"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "18446744073709552"),
            )
            .mount(&server)
            .await;

        let err = service(&server).advance("sim1").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RateLimited {
                retry_after_ms: u64::MAX
            }
        ));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generation/sim1/cancel"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = service(&server).cancel("sim1").await.unwrap_err();
        match err {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_pending_passes_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generation/pending"))
            .and(query_param("user_id", "u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "sim7", "titulo": "Constitucional", "total": 20, "geradas": 8}
            ])))
            .mount(&server)
            .await;

        let pending = service(&server).list_pending("u1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "sim7");
        assert_eq!(pending[0].geradas, 8);
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let svc =
            HttpGenerationService::with_base_url(String::new(), "http://127.0.0.1:1".into())
                .unwrap();
        let err = svc.advance("sim1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)));
    }
}
