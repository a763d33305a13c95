//! Shared outbound HTTP client.
//!
//! Every channel sender goes through [`OutboundClient::send_json`], which
//! checks the destination against the URL safety rules before any network
//! call. Each send is a single attempt: success is exactly HTTP 200 and
//! nothing is retried.

use reqwest::{redirect, Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use domain::models::{DispatchResult, WebhookMethod};
use shared::url_safety::{check_outbound_url, OutboundPolicy};

use crate::config::OutboundConfig;

pub struct OutboundClient {
    client: Client,
    policy: OutboundPolicy,
}

impl OutboundClient {
    pub fn new(config: &OutboundConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(
            config.request_timeout(),
            config.connect_timeout(),
            config.policy(),
        )
    }

    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
        policy: OutboundPolicy,
    ) -> Result<Self, reqwest::Error> {
        // Redirects could lead to an address that was never validated.
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("taskly-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> OutboundPolicy {
        self.policy
    }

    /// Sends `body` to `url` once.
    ///
    /// `GET` requests carry the scalar top-level fields of `body` as query
    /// parameters; every other method sends `body` as JSON. `channel` only
    /// labels the log entries.
    pub async fn send_json(
        &self,
        channel: &'static str,
        method: WebhookMethod,
        url: &str,
        body: &Value,
    ) -> DispatchResult {
        let target = match check_outbound_url(url, self.policy).await {
            Ok(target) => target,
            Err(reason) => {
                warn!(
                    channel,
                    target_url = %redact(url),
                    reason = %reason,
                    "Outbound request blocked by URL safety check"
                );
                return DispatchResult::Rejected {
                    url: redact(url),
                };
            }
        };

        let request = match method {
            WebhookMethod::Get => self.client.get(target).query(&query_pairs(body)),
            other => self
                .client
                .request(to_reqwest_method(other), target)
                .json(body),
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 {
                    info!(
                        channel,
                        target_url = %redact(url),
                        method = method.as_str(),
                        status_code = status,
                        "Outbound request delivered"
                    );
                    DispatchResult::Delivered { status }
                } else {
                    warn!(
                        channel,
                        target_url = %redact(url),
                        method = method.as_str(),
                        status_code = status,
                        "Outbound request returned non-200 status"
                    );
                    DispatchResult::Failed {
                        status: Some(status),
                        error: format!("Unexpected status {}", status),
                    }
                }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    "Connection failed".to_string()
                } else {
                    "Request failed".to_string()
                };
                warn!(
                    channel,
                    target_url = %redact(url),
                    method = method.as_str(),
                    error = %e.without_url(),
                    "Outbound request failed"
                );
                DispatchResult::Failed {
                    status: None,
                    error,
                }
            }
        }
    }
}

fn to_reqwest_method(method: WebhookMethod) -> Method {
    match method {
        WebhookMethod::Get => Method::GET,
        WebhookMethod::Post => Method::POST,
        WebhookMethod::Put => Method::PUT,
        WebhookMethod::Patch => Method::PATCH,
        WebhookMethod::Delete => Method::DELETE,
    }
}

/// Scalar top-level fields of a JSON object as query pairs.
fn query_pairs(body: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = body else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Strips the path of bot API URLs, which embed the bot token.
pub fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.path().starts_with("/bot") => {
            format!(
                "{}://{}/bot[REDACTED]",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default()
            )
        }
        _ => url.to_string(),
    }
}
