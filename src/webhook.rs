use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use crate::content::Payload;
use crate::error::Error;

/// Attempts per delivery, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Used when a 429 body carries no usable `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;
const MAX_RETRY_AFTER_SECS: f64 = 3600.0;

/// Username and avatar shown instead of the ones set on the webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Everything needed to post one message.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// Webhook URL, already carrying `wait=true`.
    pub url: Url,
    pub payload: Payload,
    pub overrides: Overrides,
}

/// Status and body exactly as the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// A message Discord accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub status: StatusCode,
    pub body: Value,
    pub attempts: u32,
}

/// Performs a single POST of a delivery request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &DeliveryRequest) -> Result<RawResponse, Error>;
}

/// [`Transport`] backed by a reqwest client sending multipart/form-data.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: &DeliveryRequest) -> Result<RawResponse, Error> {
        let response = self
            .client
            .post(request.url.clone())
            .multipart(build_form(request)?)
            .send()
            .await?;

        let status = response.status();
        debug!("response status: {status}");
        debug!("response headers: {:?}", response.headers());

        let body = response.text().await?;
        debug!("response body: {body}");

        Ok(RawResponse { status, body })
    }
}

fn build_form(request: &DeliveryRequest) -> Result<Form, Error> {
    let mut form = Form::new();

    if let Some(content) = &request.payload.content {
        debug!("content: {content}");
        form = form.text("content", content.clone());
    }
    for attachment in &request.payload.attachments {
        debug!(
            "{}: {} ({} bytes)",
            attachment.field,
            attachment.file_name,
            attachment.bytes.len()
        );
        let mut part =
            Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone());
        if let Some(mime) = attachment.mime {
            part = part.mime_str(mime)?;
        }
        form = form.part(attachment.field, part);
    }
    if let Some(username) = &request.overrides.username {
        form = form.text("username", username.clone());
    }
    if let Some(avatar_url) = &request.overrides.avatar_url {
        form = form.text("avatar_url", avatar_url.clone());
    }

    Ok(form)
}

/// Posts messages to a webhook, retrying while Discord rate limits us.
pub struct Webhook<T> {
    transport: T,
    max_attempts: u32,
}

impl<T: Transport> Webhook<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` and returns the created message.
    ///
    /// A 429 answer is retried after `retry_after × attempt` seconds, until
    /// [`MAX_ATTEMPTS`] requests were made. Every other non-2xx status fails
    /// immediately with [`Error::ServerRejected`].
    pub async fn send(&self, request: &DeliveryRequest) -> Result<Delivered, Error> {
        debug!("url: {}", request.url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self.transport.post(request).await?;

            if response.status.is_success() {
                let body = serde_json::from_str(&response.body).map_err(Error::ResponseParse)?;
                return Ok(Delivered {
                    status: response.status,
                    body,
                    attempts: attempt,
                });
            }

            if response.status != StatusCode::TOO_MANY_REQUESTS {
                return Err(Error::ServerRejected {
                    status: response.status.as_u16(),
                    body: response.body,
                });
            }

            if attempt >= self.max_attempts {
                return Err(Error::RateLimitExhausted { attempts: attempt });
            }

            let wait = retry_after(&response.body)?.mul_f64(f64::from(attempt));
            warn!(
                "rate limited: retry attempt {} in {:.2}s",
                attempt + 1,
                wait.as_secs_f64()
            );
            sleep(wait).await;
        }
    }
}

fn retry_after(body: &str) -> Result<Duration, Error> {
    let value: Value = serde_json::from_str(body).map_err(Error::ResponseParse)?;
    let secs = value
        .get("retry_after")
        .and_then(Value::as_f64)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
        .min(MAX_RETRY_AFTER_SECS);
    Ok(Duration::from_secs_f64(secs))
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedTransport, request};
    use super::*;
    use tokio::time::Instant;

    const CREATED: &str = r#"{"id": "1", "content": "hello"}"#;
    const LIMITED: &str = r#"{"message": "You are being rate limited.", "retry_after": 1, "global": false}"#;

    #[tokio::test]
    async fn test_delivered_on_first_attempt() {
        let webhook = Webhook::new(ScriptedTransport::new([(200, CREATED)]));

        let delivered = webhook.send(&request("hello")).await.unwrap();

        assert_eq!(delivered.status, StatusCode::OK);
        assert_eq!(delivered.attempts, 1);
        assert_eq!(delivered.body["content"], "hello");
        assert_eq!(webhook.transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_linear_backoff() {
        let webhook = Webhook::new(ScriptedTransport::new([
            (429, LIMITED),
            (429, LIMITED),
            (200, CREATED),
        ]));
        let start = Instant::now();

        let delivered = webhook.send(&request("hello")).await.unwrap();

        assert_eq!(delivered.attempts, 3);
        assert_eq!(webhook.transport.calls(), 3);
        assert!(
            start.elapsed() >= Duration::from_secs(3),
            "Expected at least 1s + 2s of backoff, waited {:?}",
            start.elapsed()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausted() {
        let webhook = Webhook::new(ScriptedTransport::new([
            (429, LIMITED),
            (429, LIMITED),
            (429, LIMITED),
            (200, CREATED),
        ]));

        let result = webhook.send(&request("hello")).await;

        assert!(matches!(
            result,
            Err(Error::RateLimitExhausted { attempts: 3 })
        ));
        assert_eq!(webhook.transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_and_missing_retry_after() {
        let webhook = Webhook::new(ScriptedTransport::new([
            (429, r#"{"retry_after": 0.25}"#),
            (429, "{}"),
            (200, CREATED),
        ]));
        let start = Instant::now();

        webhook.send(&request("hello")).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(250 + 2000));
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let webhook = Webhook::new(ScriptedTransport::new([
            (400, r#"{"message": "Cannot send an empty message", "code": 50006}"#),
            (200, CREATED),
        ]));

        let result = webhook.send(&request("")).await;

        match result {
            Err(Error::ServerRejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("50006"));
            }
            other => panic!("Expected ServerRejected, got {other:?}"),
        }
        assert_eq!(webhook.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_body_need_not_be_json() {
        let webhook = Webhook::new(ScriptedTransport::new([(502, "<html>Bad Gateway</html>")]));

        let result = webhook.send(&request("hello")).await;

        assert!(matches!(
            result,
            Err(Error::ServerRejected { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_success_body_must_be_json() {
        let webhook = Webhook::new(ScriptedTransport::new([(200, "ok")]));

        let result = webhook.send(&request("hello")).await;

        assert!(matches!(result, Err(Error::ResponseParse(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_body_must_be_json() {
        let webhook = Webhook::new(ScriptedTransport::new([(429, "slow down")]));

        let result = webhook.send(&request("hello")).await;

        assert!(matches!(result, Err(Error::ResponseParse(_))));
        assert_eq!(webhook.transport.calls(), 1);
    }

    #[test]
    fn test_retry_after_is_capped() {
        let wait = retry_after(r#"{"retry_after": 1e300}"#).unwrap();

        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[ignore = "This test requires a valid Discord webhook URL"]
    #[tokio::test]
    async fn test_discord_notification() {
        let webhook_url = dotenvy::var("WEBHOOK_URL").expect("WEBHOOK_URL not set");
        let mut url = Url::parse(&webhook_url).expect("Invalid WEBHOOK_URL");
        url.query_pairs_mut().append_pair("wait", "true");
        let webhook = Webhook::new(
            ReqwestTransport::new(Duration::from_secs(10)).expect("Failed to build client"),
        );

        let result = webhook
            .send(&DeliveryRequest {
                url,
                ..request("Test notification from Rust!")
            })
            .await;

        assert!(
            result.is_ok(),
            "Expected notification to be sent successfully"
        );
    }
}
