//! Slack incoming-webhook sender.

use serde::Serialize;
use std::sync::Arc;

use domain::models::{DispatchResult, WebhookMethod};

use super::outbound::OutboundClient;

pub const CHANNEL: &str = "slack";

const ICON_EMOJI: &str = ":bell:";

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

pub struct SlackSender {
    outbound: Arc<OutboundClient>,
}

impl SlackSender {
    pub fn new(outbound: Arc<OutboundClient>) -> Self {
        Self { outbound }
    }

    /// Posts `text` to an incoming-webhook URL, shown as from `username`.
    pub async fn send(&self, webhook_url: &str, text: &str, username: &str) -> DispatchResult {
        let message = SlackMessage {
            text,
            username,
            icon_emoji: ICON_EMOJI,
        };

        match serde_json::to_value(&message) {
            Ok(body) => {
                self.outbound
                    .send_json(CHANNEL, WebhookMethod::Post, webhook_url, &body)
                    .await
            }
            Err(e) => DispatchResult::Failed {
                status: None,
                error: e.to_string(),
            },
        }
    }
}
