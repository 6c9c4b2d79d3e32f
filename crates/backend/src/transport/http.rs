//! HTTP transport for backend requests.

use crate::error::{BackendError, BackendResult};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("licenseguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::ClientSetup(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON body and decode a JSON response. Single attempt.
    pub async fn post_json<T, B>(&self, url: &Url, body: &B, bearer: Option<&str>) -> BackendResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(url = %url, "POST request");

        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::from_send(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %url, "Backend rejected request");
            return Err(rejected(status.as_u16(), response.text().await));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout {
                    after: self.timeout,
                }
            } else {
                BackendError::InvalidResponse(format!("failed to read response body: {}", e))
            }
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, "Backend response did not match the expected shape");
            BackendError::InvalidResponse(e.to_string())
        })
    }
}

/// Build `RejectedRequest`, keeping a note in the body when it could not be read.
fn rejected<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> BackendError {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(status, error = %e, "Failed to read rejected response body");
            format!("<failed to read response body: {}>", e)
        }
    };
    BackendError::RejectedRequest { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
        value: i32,
    }

    #[derive(Debug, Serialize)]
    struct TestRequest {
        name: String,
    }

    fn endpoint(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn test_post_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/create"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "created".to_string(),
                value: 1,
            }))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let request = TestRequest {
            name: "test".to_string(),
        };

        let result: TestResponse = transport
            .post_json(&endpoint(&server, "/api/create"), &request, None)
            .await
            .unwrap();
        assert_eq!(result.message, "created");
        assert_eq!(result.value, 1);
    }

    #[tokio::test]
    async fn test_authorization_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/protected"))
            .and(header("Authorization", "Bearer sk-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "authorized".to_string(),
                value: 100,
            }))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let result: TestResponse = transport
            .post_json(
                &endpoint(&server, "/api/protected"),
                &serde_json::json!({}),
                Some("sk-test-key"),
            )
            .await
            .unwrap();
        assert_eq!(result.message, "authorized");
    }

    #[tokio::test]
    async fn test_error_on_404_keeps_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let result: BackendResult<TestResponse> = transport
            .post_json(&endpoint(&server, "/api/missing"), &serde_json::json!({}), None)
            .await;

        match result {
            Err(BackendError::RejectedRequest { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not found");
            }
            other => panic!("Expected RejectedRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_shape_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"unexpected": true})))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let result: BackendResult<TestResponse> = transport
            .post_json(&endpoint(&server, "/"), &serde_json::json!({}), None)
            .await;

        assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_invalid_token_is_invalid_request() {
        let server = MockServer::start().await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let result: BackendResult<TestResponse> = transport
            .post_json(
                &endpoint(&server, "/"),
                &serde_json::json!({}),
                Some("bad\ntoken"),
            )
            .await;

        assert!(matches!(result, Err(BackendError::InvalidRequest(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_rejected_body_is_noted() {
        match rejected(502, Err::<String, _>("connection reset")) {
            BackendError::RejectedRequest { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("failed to read response body"));
                assert!(body.contains("connection reset"));
            }
            other => panic!("Expected RejectedRequest, got {:?}", other),
        }

        assert!(matches!(
            rejected::<String>(500, Ok("boom".to_string())),
            BackendError::RejectedRequest { status: 500, ref body } if body == "boom"
        ));
    }
}
