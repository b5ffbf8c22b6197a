//! HTTP/JSON transport for the downstream services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use resilience::{CallRequest, CallResponse, Endpoint, Transport, TransportError};

/// Calls downstream services as `POST http://{addr}/{service}/{method}`
/// with a JSON body, probing liveness on `GET /health`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a 5 s per-request timeout.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::DeadlineExceeded
    } else {
        TransportError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        endpoint: &Endpoint,
        request: CallRequest,
    ) -> Result<CallResponse, TransportError> {
        let url = format!(
            "http://{}/{}/{}",
            endpoint.addr, request.service, request.method
        );
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.payload)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Aborted(err.to_string()))?;

        match status {
            StatusCode::NOT_FOUND => Err(TransportError::NotFound(format!("{url} returned 404"))),
            StatusCode::CONFLICT => Err(TransportError::Aborted(format!("{url} returned 409"))),
            code if code.is_success() => Ok(CallResponse {
                payload: body.to_vec(),
            }),
            code if code.is_client_error() => Err(TransportError::Rejected(format!(
                "{url} returned {}",
                code.as_u16()
            ))),
            code => Err(TransportError::Unavailable(format!(
                "{url} returned {}",
                code.as_u16()
            ))),
        }
    }

    async fn ping(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let url = format!("http://{}/health", endpoint.addr);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_send_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Unavailable(format!(
                "{url} returned {}",
                response.status().as_u16()
            )))
        }
    }
}
