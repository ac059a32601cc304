//! Payment gateway client.
//!
//! Contract: `POST <gateway>/payments` with `Authorization: Bearer
//! <payment_token>` and body `{"amount": <int>}`. Upstream failures
//! (5xx or transport errors) are retried a small fixed number of times;
//! exhausting the budget surfaces as a bad gateway. Any other non-2xx
//! response is terminal.

use std::time::Duration;

use serde::Serialize;

use crate::error::DispatchError;

#[derive(Debug, Serialize)]
struct PaymentRequest {
    amount: i64,
}

/// HTTP client for the external payment gateway.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl PaymentClient {
    /// Creates a client with the given retry budget.
    #[must_use]
    pub fn new(retry_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            retry_attempts,
            retry_delay,
        }
    }

    /// Charges `amount` against the rider's payment token.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UpstreamFailed`] when the gateway keeps erroring
    /// upstream; [`DispatchError::Internal`] on a terminal rejection.
    pub async fn post_payment(
        &self,
        gateway_url: &str,
        payment_token: &str,
        amount: i64,
    ) -> Result<(), DispatchError> {
        let url = format!("{gateway_url}/payments");
        let mut last_upstream_error = String::new();

        for attempt in 0..self.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .http
                .post(&url)
                .bearer_auth(payment_token)
                .json(&PaymentRequest { amount })
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) if resp.status().is_server_error() => {
                    last_upstream_error = format!("gateway returned {}", resp.status());
                    tracing::warn!(attempt, status = %resp.status(), "payment errored upstream");
                }
                Ok(resp) => {
                    return Err(DispatchError::Internal(format!(
                        "payment rejected with {}",
                        resp.status()
                    )));
                }
                Err(err) => {
                    last_upstream_error = err.to_string();
                    tracing::warn!(attempt, error = %err, "payment request failed");
                }
            }
        }

        Err(DispatchError::UpstreamFailed(last_upstream_error))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    use super::*;

    /// Serves a gateway stub that fails `failures` times before
    /// accepting, and returns its base URL.
    async fn spawn_gateway(failures: u32) -> (String, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let state = Arc::clone(&calls);

        let app = Router::new()
            .route(
                "/payments",
                post(move |State(calls): State<Arc<AtomicU32>>| async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        StatusCode::NO_CONTENT
                    }
                }),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind failed: {e}"));
        let addr = listener.local_addr().unwrap_or_else(|e| panic!("{e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{addr}"), calls)
    }

    fn client(attempts: u32) -> PaymentClient {
        PaymentClient::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let (url, calls) = spawn_gateway(0).await;
        let result = client(5).post_payment(&url, "token", 1200).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_through_upstream_errors() {
        let (url, calls) = spawn_gateway(2).await;
        let result = client(5).post_payment(&url, "token", 500).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_is_bad_gateway() {
        let (url, calls) = spawn_gateway(u32::MAX).await;
        let result = client(3).post_payment(&url, "token", 500).await;
        assert!(matches!(result, Err(DispatchError::UpstreamFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_rejection_is_terminal() {
        let app = Router::new().route("/payments", post(|| async { StatusCode::BAD_REQUEST }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind failed: {e}"));
        let addr = listener.local_addr().unwrap_or_else(|e| panic!("{e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let result = client(5)
            .post_payment(&format!("http://{addr}"), "token", 500)
            .await;
        assert!(matches!(result, Err(DispatchError::Internal(_))));
    }
}
