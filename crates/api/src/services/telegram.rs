//! Telegram bot API sender.

use serde::Serialize;
use std::sync::Arc;

use domain::models::{DispatchResult, WebhookMethod};

use super::outbound::OutboundClient;

pub const CHANNEL: &str = "telegram";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramSender {
    outbound: Arc<OutboundClient>,
    api_base: String,
}

impl TelegramSender {
    pub fn new(outbound: Arc<OutboundClient>, api_base: impl Into<String>) -> Self {
        Self {
            outbound,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn send_message_url(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, bot_token)
    }

    /// Posts `text` to `chat_id`. The text is sent as HTML, so markup
    /// characters in it are escaped.
    pub async fn send(&self, bot_token: &str, chat_id: &str, text: &str) -> DispatchResult {
        let message = SendMessage {
            chat_id,
            text: escape_html(text),
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        match serde_json::to_value(&message) {
            Ok(body) => {
                self.outbound
                    .send_json(
                        CHANNEL,
                        WebhookMethod::Post,
                        &self.send_message_url(bot_token),
                        &body,
                    )
                    .await
            }
            Err(e) => DispatchResult::Failed {
                status: None,
                error: e.to_string(),
            },
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use shared::url_safety::OutboundPolicy;
    use std::time::Duration;

    fn sender(api_base: String) -> TelegramSender {
        let outbound = OutboundClient::with_timeouts(
            Duration::from_secs(5),
            Duration::from_secs(2),
            OutboundPolicy {
                allow_private_network: true,
            },
        )
        .unwrap();
        TelegramSender::new(Arc::new(outbound), api_base)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_send_message_url() {
        let sender = sender("https://api.telegram.org/".to_string());
        assert_eq!(
            sender.send_message_url("123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_telegram_payload_shape() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage").json_body(json!({
                "chat_id": "-100200",
                "text": "Deploy &lt;prod&gt;",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            }));
            then.status(200).json_body(json!({"ok": true}));
        });

        let result = sender(server.base_url())
            .send("123:abc", "-100200", "Deploy <prod>")
            .await;

        assert_eq!(result, DispatchResult::Delivered { status: 200 });
        mock.assert();
    }

    #[tokio::test]
    async fn test_telegram_error_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/botbad/sendMessage");
            then.status(401).json_body(json!({"ok": false}));
        });

        let result = sender(server.base_url()).send("bad", "1", "hi").await;

        assert!(matches!(result, DispatchResult::Failed { status: Some(401), .. }));
        assert_eq!(mock.calls(), 1);
    }
}
