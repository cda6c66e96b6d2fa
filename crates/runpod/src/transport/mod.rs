//! Single-flight GraphQL transport.
//!
//! Every exchange for a credential goes through one queue drained by one
//! worker task, so at most one request is in flight at a time and requests
//! run in submission order. RunPod misbehaves under concurrent calls from a
//! single key.
//!
//! ```text
//!  caller ──► mpsc queue ──► worker ──► HTTP POST (retry on 429/503)
//!    ▲                          │
//!    └──────── oneshot ◄────────┘
//! ```
//!
//! Each queued exchange races against its caller's [`CancellationToken`],
//! the transport-wide shutdown token and the caller dropping its future, which
//! makes backoff waits abortable.

mod envelope;
mod retry;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use envelope::{GraphQlError, GraphQlRequest, GraphQlResponse, Variables};
pub use retry::RetryPolicy;

use crate::config::{CredentialPlacement, ProviderConfig};
use crate::error::RunpodError;

/// Maximum length of a response body written to logs.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Shared handle to the request worker. Cheap to clone.
#[derive(Clone)]
pub struct Transport {
    queue: mpsc::UnboundedSender<Exchange>,
    shutdown: CancellationToken,
}

/// A queued request and the channel its result goes back on.
struct Exchange {
    request: GraphQlRequest,
    cancel: CancellationToken,
    reply: oneshot::Sender<Result<Value, RunpodError>>,
}

/// Performs one exchange, including retries. Owned by the worker.
struct Exchanger {
    http: Client,
    endpoint: String,
    api_key: String,
    placement: CredentialPlacement,
    retry: RetryPolicy,
}

impl Transport {
    /// Build the HTTP client and start the request worker.
    ///
    /// # Errors
    /// Returns an error if no API key is configured, the HTTP client cannot
    /// be built, or no tokio runtime is running.
    pub fn new(config: &ProviderConfig) -> Result<Self, RunpodError> {
        let api_key = config.resolve_api_key()?;
        let endpoint = config.resolve_endpoint();

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("runpod-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let exchanger = Exchanger {
            http,
            endpoint,
            api_key,
            placement: config.credential_placement,
            retry: config.retry_policy(),
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| RunpodError::Config("a tokio runtime is required".to_string()))?;

        let (queue, requests) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        runtime.spawn(run_worker(exchanger, requests, shutdown.clone()));

        Ok(Self { queue, shutdown })
    }

    /// Execute a GraphQL document and return its `data` payload.
    ///
    /// # Errors
    /// See [`RunpodError`].
    pub async fn execute(&self, document: &str, variables: Variables) -> Result<Value, RunpodError> {
        self.execute_with_cancel(document, variables, CancellationToken::new())
            .await
    }

    /// Like [`Transport::execute`], but abortable through `cancel`.
    ///
    /// Cancelling while the request is still queued means it is never sent;
    /// cancelling during a backoff wait ends the wait immediately.
    ///
    /// # Errors
    /// Returns [`RunpodError::Cancelled`] when `cancel` fires first.
    pub async fn execute_with_cancel(
        &self,
        document: &str,
        variables: Variables,
        cancel: CancellationToken,
    ) -> Result<Value, RunpodError> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Exchange {
                request: GraphQlRequest::new(document, variables),
                cancel,
                reply,
            })
            .map_err(|_| RunpodError::WorkerStopped)?;

        response.await.map_err(|_| RunpodError::WorkerStopped)?
    }

    /// Cancel everything queued or in flight and stop the worker.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn run_worker(
    exchanger: Exchanger,
    mut requests: mpsc::UnboundedReceiver<Exchange>,
    shutdown: CancellationToken,
) {
    loop {
        let exchange = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = requests.recv() => match next {
                Some(exchange) => exchange,
                None => break,
            },
        };

        let Exchange {
            request,
            cancel,
            mut reply,
        } = exchange;

        if reply.is_closed() {
            debug!("Caller went away, dropping queued request");
            continue;
        }

        let result = tokio::select! {
            biased;
            () = shutdown.cancelled() => Err(RunpodError::Cancelled),
            () = cancel.cancelled() => Err(RunpodError::Cancelled),
            () = reply.closed() => {
                debug!("Caller went away, abandoning request");
                continue;
            }
            result = exchanger.exchange(&request) => result,
        };

        let _ = reply.send(result);
    }
    debug!("Request worker stopped");
}

impl Exchanger {
    async fn exchange(&self, request: &GraphQlRequest) -> Result<Value, RunpodError> {
        let body = serde_json::to_vec(request)?;
        let mut last_status = 0;

        for attempt in 0..self.retry.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = self.retry.max_attempts,
                "GraphQL request"
            );

            let response = self
                .request(body.clone())
                .send()
                .await
                .map_err(|e| RunpodError::Transport(e.without_url()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| RunpodError::Transport(e.without_url()))?;

            if RetryPolicy::is_retryable(status) {
                last_status = status.as_u16();
                if attempt + 1 < self.retry.max_attempts {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        status = last_status,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                warn!(status = status.as_u16(), body = %truncate_for_log(&text), "API error");
                return Err(RunpodError::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let envelope: GraphQlResponse = serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %truncate_for_log(&text), "Failed to parse response");
                RunpodError::Serialization(e)
            })?;

            return envelope.into_data().inspect_err(|e| {
                if let RunpodError::Protocol { messages } = e {
                    debug!(count = messages.len(), errors = ?messages, "GraphQL errors");
                }
            });
        }

        Err(RunpodError::MaxRetriesExceeded {
            attempts: self.retry.max_attempts,
            status: last_status,
        })
    }

    fn request(&self, body: Vec<u8>) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        match self.placement {
            CredentialPlacement::QueryParam => builder.query(&[("api_key", self.api_key.as_str())]),
            CredentialPlacement::BearerHeader => builder.bearer_auth(&self.api_key),
        }
    }
}

/// Truncate a response body before it reaches the logs.
fn truncate_for_log(body: &str) -> String {
    if body.len() <= MAX_LOG_BODY_LENGTH {
        return body.to_string();
    }
    let cut = (0..=MAX_LOG_BODY_LENGTH)
        .rev()
        .find(|i| body.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_keeps_short_bodies() {
        assert_eq!(truncate_for_log("short"), "short");
    }

    #[test]
    fn test_truncate_for_log_cuts_long_bodies() {
        let body = "é".repeat(300);
        let logged = truncate_for_log(&body);
        assert!(logged.contains("[truncated, 600 bytes total]"));
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let config = ProviderConfig::with_api_key("key");
        assert!(matches!(Transport::new(&config), Err(RunpodError::Config(_))));
    }
}
