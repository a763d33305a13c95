//! Tenant webhook sender.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use domain::models::{ChannelOutcome, DispatchResult, ResolvedScope, SkipReason};
use domain::services::WebhookStore;
use domain::StoreError;

use super::outbound::OutboundClient;

pub const CHANNEL: &str = "webhook";

pub struct WebhookSender {
    outbound: Arc<OutboundClient>,
    store: Arc<dyn WebhookStore>,
}

impl WebhookSender {
    pub fn new(outbound: Arc<OutboundClient>, store: Arc<dyn WebhookStore>) -> Self {
        Self { outbound, store }
    }

    /// Calls every webhook the tenant registered for `module`, one attempt each.
    ///
    /// Returns a single `no_webhook` outcome when none is registered.
    pub async fn send(
        &self,
        scope: ResolvedScope,
        module: &str,
        payload: &Value,
    ) -> Result<Vec<ChannelOutcome>, StoreError> {
        let webhooks = self
            .store
            .find_for_module(scope.user_id, scope.workspace_id, module)
            .await?;

        if webhooks.is_empty() {
            debug!(
                user_id = scope.user_id,
                workspace_id = ?scope.workspace_id,
                module,
                "No webhook registered for module"
            );
            return Ok(vec![ChannelOutcome {
                channel: CHANNEL,
                target: None,
                result: DispatchResult::skipped(SkipReason::NoWebhook),
            }]);
        }

        let mut outcomes = Vec::with_capacity(webhooks.len());
        for webhook in webhooks {
            let result = self
                .outbound
                .send_json(CHANNEL, webhook.method, &webhook.url, payload)
                .await;
            outcomes.push(ChannelOutcome {
                channel: CHANNEL,
                target: Some(webhook.url),
                result,
            });
        }

        Ok(outcomes)
    }
}

/// Webhook body for an event without an explicit payload: the variables
/// with their placeholder braces removed.
pub fn payload_from_variables(module: &str, variables: &BTreeMap<String, String>) -> Value {
    let mut map = Map::new();
    map.insert("module".to_string(), Value::String(module.to_string()));
    for (key, value) in variables {
        let key = key.trim_start_matches('{').trim_end_matches('}');
        if !key.is_empty() {
            map.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    Value::Object(map)
}
