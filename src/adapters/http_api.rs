//! HTTP-API adapter for a third-party transactional email provider.
//!
//! Posts the rendered message as form data to the provider's messages
//! endpoint with basic authentication. A persistent [`reqwest::Client`]
//! is reused across calls; `reqwest` pools connections internally, so
//! sequential and concurrent reuse are both safe.
//!
//! Failure classes are kept distinct on purpose: absent credentials fail
//! fast without a network call, a non-success status carries the response
//! body as a protocol failure, and network-level `reqwest` errors
//! propagate unwrapped.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    adapters::{Adapter, AdapterName},
    address::EmailAddress,
    config::HttpApiConfig,
    error::SendError,
    message::{EmailPayload, SendResult},
    render::TemplateRenderer,
};

/// Display name stamped on the form `from` field.
const FROM_DISPLAY_NAME: &str = "QuizVault";

const USER_AGENT: &str = concat!("courier-mailer/", env!("CARGO_PKG_VERSION"));

const WARMUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpApiAdapter {
    client: reqwest::Client,
    config: HttpApiConfig,
    renderer: TemplateRenderer,
    from: EmailAddress,
}

impl HttpApiAdapter {
    /// Build the adapter with its persistent HTTP client.
    ///
    /// `fallback_sender` is used as the from-address when the config does
    /// not carry a transport-specific one.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: HttpApiConfig,
        renderer: TemplateRenderer,
        fallback_sender: EmailAddress,
    ) -> Result<Self, SendError> {
        if config.api_key.is_none() || config.domain.is_none() {
            warn!("HTTP API credentials missing, adapter will fail fast if tried");
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let from = config.sender.clone().unwrap_or(fallback_sender);

        Ok(Self {
            client,
            config,
            renderer,
            from,
        })
    }

    /// Probe the provider once to warm the connection pool. Best effort:
    /// failure is logged and never fatal.
    pub async fn warm_up(&self) {
        if !self.config.warmup {
            return;
        }

        let url = format!("{}/domains", self.config.api_base);
        let request = self.client.get(&url).timeout(WARMUP_TIMEOUT);
        let request = match self.config.api_key.as_deref() {
            Some(key) => request.basic_auth("api", Some(key)),
            None => request,
        };

        if let Err(err) = request.send().await {
            warn!(error = %err, "HTTP API warmup failed");
        }
    }

    fn credentials(&self) -> Result<(&str, &str), SendError> {
        match (self.config.api_key.as_deref(), self.config.domain.as_deref()) {
            (Some(api_key), Some(domain)) => Ok((api_key, domain)),
            _ => Err(SendError::Configuration(
                "HTTP API key or sending domain not configured".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Adapter for HttpApiAdapter {
    fn name(&self) -> AdapterName {
        AdapterName::HttpApi
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendResult, SendError> {
        // Fail before rendering or any network work when unconfigured.
        let (api_key, domain) = self.credentials()?;

        let message = self
            .renderer
            .render(&payload.template_id, &payload.to, &payload.template_vars)?;

        let url = format!("{}/{domain}/messages", self.config.api_base);
        let from = format!("{FROM_DISPLAY_NAME} <{}>", self.from);
        let to = payload.to.to_string();
        let form = [
            ("from", from.as_str()),
            ("to", to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.body.as_str()),
        ];

        info!(to = %payload.to, "sending email via HTTP API");
        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(to = %payload.to, "HTTP API accepted email");
            return Ok(SendResult::accepted(AdapterName::HttpApi));
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "HTTP API send failed");
        Err(SendError::Protocol {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{collections::HashMap, net::SocketAddr};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;
    use crate::message::DeliveryGuarantee;

    /// One-shot HTTP stub: accepts a single connection, captures the raw
    /// request, and answers with a canned status and body.
    async fn spawn_stub(status: u16, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = find(&request, b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Test\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&request).into_owned()
        });

        (addr, handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn config_for(addr: Option<SocketAddr>) -> HttpApiConfig {
        HttpApiConfig {
            api_key: addr.map(|_| "key-123".to_string()),
            domain: addr.map(|_| "mg.example.com".to_string()),
            api_base: addr.map_or_else(
                || "http://127.0.0.1:1/v3".to_string(),
                |addr| format!("http://{addr}/v3"),
            ),
            warmup: false,
            ..HttpApiConfig::default()
        }
    }

    fn adapter(config: HttpApiConfig) -> HttpApiAdapter {
        let renderer = TemplateRenderer::new(
            "test-sender@example.com".parse().unwrap(),
            "https://example.com",
        );
        HttpApiAdapter::new(config, renderer, "test-sender@example.com".parse().unwrap()).unwrap()
    }

    fn payload() -> EmailPayload {
        let vars: HashMap<_, _> = [("subject", "hi"), ("body", "plain body")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EmailPayload::new("user@example.com", "custom", vars).unwrap()
    }

    #[tokio::test]
    async fn missing_credentials_fail_fast_without_network() {
        // api_base points at a closed port: a network attempt would error
        // differently than the configuration failure we expect.
        let err = adapter(config_for(None)).send(&payload()).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn posts_form_with_auth_and_accepts_success() {
        let (addr, captured) = spawn_stub(200, "{\"id\": \"<test>@mailgun\"}").await;
        let res = adapter(config_for(Some(addr)))
            .send(&payload())
            .await
            .unwrap();

        assert!(res.ok);
        assert_eq!(res.adapter, AdapterName::HttpApi);
        assert_eq!(res.guarantee, DeliveryGuarantee::Accepted);

        let request = captured.await.unwrap();
        assert!(request.starts_with("POST /v3/mg.example.com/messages"));
        assert!(request.contains("authorization: Basic") || request.contains("Authorization: Basic"));
        assert!(request.contains("subject=hi"));
        assert!(request.contains("text=plain+body"));
        assert!(request.contains("to=user%40example.com"));
    }

    #[tokio::test]
    async fn non_success_status_embeds_response_body() {
        let (addr, _captured) = spawn_stub(500, "server error").await;
        let err = adapter(config_for(Some(addr)))
            .send(&payload())
            .await
            .unwrap_err();

        match err {
            SendError::Protocol { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "server error");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn warm_up_probes_the_domains_endpoint_with_auth() {
        let (addr, captured) = spawn_stub(200, "{}").await;
        let config = HttpApiConfig {
            warmup: true,
            ..config_for(Some(addr))
        };

        adapter(config).warm_up().await;

        let request = captured.await.unwrap();
        assert!(request.starts_with("GET /v3/domains"));
        assert!(
            request.contains("authorization: Basic") || request.contains("Authorization: Basic")
        );
    }

    #[tokio::test]
    async fn warm_up_disabled_makes_no_request() {
        let (addr, captured) = spawn_stub(200, "{}").await;
        let config = config_for(Some(addr));
        assert!(!config.warmup);

        adapter(config).warm_up().await;

        // The stub never sees a connection; its accept is still pending.
        let outcome = tokio::time::timeout(Duration::from_millis(200), captured).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn warm_up_failure_is_not_fatal() {
        // Nothing listening; the probe must swallow the error.
        let config = HttpApiConfig {
            api_key: Some("key-123".to_string()),
            domain: Some("mg.example.com".to_string()),
            api_base: "http://127.0.0.1:1/v3".to_string(),
            warmup: true,
            ..HttpApiConfig::default()
        };
        adapter(config).warm_up().await;
    }

    #[tokio::test]
    async fn network_error_propagates_unwrapped() {
        // Nothing is listening on the target port.
        let config = HttpApiConfig {
            api_key: Some("key-123".to_string()),
            domain: Some("mg.example.com".to_string()),
            api_base: "http://127.0.0.1:1/v3".to_string(),
            warmup: false,
            ..HttpApiConfig::default()
        };

        let err = adapter(config).send(&payload()).await.unwrap_err();
        assert!(matches!(err, SendError::Http(_)));
    }
}
