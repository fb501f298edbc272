use async_trait::async_trait;
use opsdesk_core::{SopConfig, ThreadContext};
use opsdesk_provider::{EscalationDelivery, EscalationTransport, HandlerError};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::SlackConfig;
use crate::error::SlackError;
use crate::types::{SlackApiResponse, SlackPostMessageRequest};

/// Escalation transport posting to a Slack channel via `chat.postMessage`.
///
/// A response with `ok: true` counts as delivered. A Slack error code
/// (`channel_not_found`, `invalid_auth`, ...) is a definitive failure. An
/// unreadable 2xx response is ambiguous: the message may have been posted.
/// Network errors, 429 and 5xx are returned as errors so the caller can
/// retry.
pub struct SlackEscalationTransport {
    config: SlackConfig,
    client: Client,
}

impl SlackEscalationTransport {
    /// Create a transport with a default `reqwest::Client` (30s timeout).
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    /// Create a transport with a custom HTTP client.
    ///
    /// Useful for testing or for sharing a connection pool.
    pub fn with_client(config: SlackConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.config.api_base_url)
    }

    async fn post_message(
        &self,
        request: &SlackPostMessageRequest,
    ) -> Result<EscalationDelivery, SlackError> {
        let url = self.api_url("chat.postMessage");

        debug!(channel = %request.channel, "posting escalation to Slack");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Slack API rate limit hit");
            return Err(SlackError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: SlackApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(EscalationDelivery::Unconfirmed {
                    reason: format!("unreadable Slack response: {e}"),
                });
            }
        };

        if api_response.ok {
            debug!(
                channel = api_response.channel.as_deref().unwrap_or("unknown"),
                ts = api_response.ts.as_deref().unwrap_or("unknown"),
                "escalation posted"
            );
        } else if api_response.error.as_deref() == Some("ratelimited") {
            return Err(SlackError::RateLimited);
        }
        Ok(EscalationDelivery::from_receipt(
            api_response.ok,
            api_response.error,
        ))
    }
}

impl std::fmt::Debug for SlackEscalationTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackEscalationTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Text posted for an escalation.
pub(crate) fn escalation_text(
    thread: &ThreadContext,
    sop: Option<&SopConfig>,
    reason: &str,
) -> String {
    let mut text = format!(":rotating_light: Escalation for thread {} at {}", thread.id, thread.location);
    if let Some(bay) = &thread.bay_id {
        text.push_str(&format!(" (bay {bay})"));
    }
    text.push_str(&format!("\n*Reason:* {reason}"));
    if let Some(sop) = sop {
        let name = if sop.name.is_empty() { &sop.id } else { &sop.name };
        text.push_str(&format!("\n*SOP:* {name}"));
    }
    if let Some(customer) = &thread.customer_ref {
        text.push_str(&format!("\n*Customer:* {customer}"));
    }
    text
}

#[async_trait]
impl EscalationTransport for SlackEscalationTransport {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(skip_all, fields(thread_id = %thread.id, transport = "slack"))]
    async fn send_escalation(
        &self,
        thread: &ThreadContext,
        sop: Option<&SopConfig>,
        reason: &str,
    ) -> Result<EscalationDelivery, HandlerError> {
        let request = SlackPostMessageRequest {
            channel: self.config.channel.clone(),
            text: escalation_text(thread, sop, reason),
        };
        self.post_message(&request).await.map_err(HandlerError::from)
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_executor::Retryable;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns canned responses.
    struct MockSlackServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockSlackServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        /// Accept one connection and respond with the given status code and
        /// body, then shut down.
        async fn respond_once(self, status_code: u16, body: &str) {
            let body = body.to_owned();
            let (mut stream, _) = self.listener.accept().await.unwrap();

            // Drain the request without parsing it.
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();

            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    }

    fn transport(base_url: &str) -> SlackEscalationTransport {
        SlackEscalationTransport::with_client(
            SlackConfig::new("xoxb-test", "#ops").with_api_base_url(base_url),
            Client::new(),
        )
    }

    fn thread() -> ThreadContext {
        ThreadContext::new("t-42", "downtown").with_bay("bay-3")
    }

    async fn escalate_against(status: u16, body: &'static str) -> Result<EscalationDelivery, HandlerError> {
        let server = MockSlackServer::start().await;
        let slack = transport(&server.base_url);
        let handle = tokio::spawn(async move { server.respond_once(status, body).await });
        let result = slack.send_escalation(&thread(), None, "device offline").await;
        handle.await.unwrap();
        result
    }

    #[test]
    fn transport_name() {
        assert_eq!(transport("http://localhost:1").name(), "slack");
    }

    #[test]
    fn text_includes_context() {
        let sop = SopConfig::new("sop-1", "reset_trackman");
        let text = escalation_text(&thread().with_customer("+15550100"), Some(&sop), "reset failed");
        assert!(text.contains("thread t-42 at downtown (bay bay-3)"));
        assert!(text.contains("*Reason:* reset failed"));
        assert!(text.contains("*SOP:* sop-1"));
        assert!(text.contains("*Customer:* +15550100"));
    }

    #[tokio::test]
    async fn ok_response_is_delivered() {
        let result = escalate_against(200, r#"{"ok":true,"channel":"C123","ts":"1.2"}"#).await;
        assert_eq!(result.unwrap(), EscalationDelivery::Delivered);
    }

    #[tokio::test]
    async fn slack_error_code_is_failed_delivery() {
        let result = escalate_against(200, r#"{"ok":false,"error":"channel_not_found"}"#).await;
        assert_eq!(
            result.unwrap(),
            EscalationDelivery::Failed {
                reason: "channel_not_found".into()
            }
        );
    }

    #[tokio::test]
    async fn not_ok_without_error_code_is_failed_delivery() {
        let result = escalate_against(200, r#"{"ok":false}"#).await;
        assert_eq!(
            result.unwrap(),
            EscalationDelivery::Failed {
                reason: "unknown_error".into()
            }
        );
    }

    #[tokio::test]
    async fn unreadable_body_is_unconfirmed() {
        let result = escalate_against(200, "<html>proxy</html>").await;
        assert!(matches!(result.unwrap(), EscalationDelivery::Unconfirmed { .. }));
    }

    #[tokio::test]
    async fn rate_limit_is_retryable_error() {
        let err = escalate_against(429, r#"{"ok":false,"error":"ratelimited"}"#)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_is_retryable_error() {
        let err = escalate_against(502, "bad gateway").await.unwrap_err();
        assert!(matches!(err, HandlerError::Http { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_api_is_transient() {
        let slack = transport("http://127.0.0.1:1");
        let err = slack
            .send_escalation(&thread(), None, "device offline")
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Transient(_)));
    }
}
