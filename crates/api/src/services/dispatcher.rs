//! Fans an application event out to the tenant's integrations.
//!
//! One dispatch resolves the tenant scope once, then runs the webhook,
//! Slack and Telegram sends in sequence. Each channel reports its own
//! terminal outcome; a failure on one channel never stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use domain::models::setting::{keys, FALLBACK_LANGUAGE};
use domain::models::{
    ChannelOutcome, DispatchEvent, DispatchResult, NotificationChannel, ResolvedScope,
    ScopeRequest, SettingsMap, SkipReason, TenantContext, GLOBAL_TEMPLATE_OWNER,
};
use domain::services::{SettingsResolver, TemplateStore};
use domain::DomainError;
use shared::template::{chat_message, render};

use super::slack::{self, SlackSender};
use super::telegram::{self, TelegramSender};
use super::webhook_sender::{self, payload_from_variables, WebhookSender};
use crate::middleware::record_dispatch_outcome;

/// Name shown on Slack messages when the tenant has no `app_name`.
const DEFAULT_SENDER_NAME: &str = "Taskly";

/// Rendered title and body of a chat template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChatContent {
    title: String,
    message: String,
}

pub struct Dispatcher {
    resolver: Arc<SettingsResolver>,
    templates: Arc<dyn TemplateStore>,
    webhooks: WebhookSender,
    slack: SlackSender,
    telegram: TelegramSender,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<SettingsResolver>,
        templates: Arc<dyn TemplateStore>,
        webhooks: WebhookSender,
        slack: SlackSender,
        telegram: TelegramSender,
    ) -> Self {
        Self {
            resolver,
            templates,
            webhooks,
            slack,
            telegram,
        }
    }

    pub async fn dispatch(
        &self,
        ctx: &TenantContext,
        scope: ScopeRequest,
        event: &DispatchEvent,
    ) -> Result<Vec<ChannelOutcome>, DomainError> {
        let Some(resolved) = self.resolver.resolve_scope(ctx, scope).await? else {
            let reason = if ctx.bootstrapping {
                SkipReason::Bootstrapping
            } else {
                SkipReason::MissingCredentials
            };
            tracing::debug!(module = %event.module, reason = %reason, "Dispatch skipped");
            let outcomes = [webhook_sender::CHANNEL, slack::CHANNEL, telegram::CHANNEL]
                .into_iter()
                .map(|channel| ChannelOutcome {
                    channel,
                    target: None,
                    result: DispatchResult::skipped(reason),
                })
                .collect::<Vec<_>>();
            record_all(&outcomes);
            return Ok(outcomes);
        };

        let settings = self.resolver.all(ctx, scope).await?;

        let payload = if event.payload.is_null() {
            payload_from_variables(&event.module, &event.variables)
        } else {
            event.payload.clone()
        };

        let mut outcomes = self
            .webhooks
            .send(resolved, &event.module, &payload)
            .await?;
        outcomes.push(self.send_slack(resolved, &settings, event).await?);
        outcomes.push(self.send_telegram(resolved, &settings, event).await?);

        tracing::info!(
            user_id = resolved.user_id,
            workspace_id = ?resolved.workspace_id,
            module = %event.module,
            delivered = outcomes.iter().filter(|o| o.result.is_delivered()).count(),
            total = outcomes.len(),
            "Dispatch completed"
        );

        record_all(&outcomes);
        Ok(outcomes)
    }

    async fn send_slack(
        &self,
        scope: ResolvedScope,
        settings: &SettingsMap,
        event: &DispatchEvent,
    ) -> Result<ChannelOutcome, DomainError> {
        let outcome = |target: Option<String>, result| ChannelOutcome {
            channel: slack::CHANNEL,
            target,
            result,
        };

        let content = match self
            .chat_content(scope, settings, NotificationChannel::Slack, event)
            .await?
        {
            Ok(content) => content,
            Err(reason) => return Ok(outcome(None, DispatchResult::skipped(reason))),
        };

        let Some(webhook_url) = explicit_or_setting(
            event.slack_webhook_url.as_deref(),
            settings,
            keys::SLACK_WEBHOOK_URL,
        ) else {
            return Ok(outcome(
                None,
                DispatchResult::skipped(SkipReason::MissingCredentials),
            ));
        };

        let username = settings
            .get(keys::APP_NAME)
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_SENDER_NAME);
        let text = chat_message(&content.title, &content.message, event.url.as_deref());

        let result = self.slack.send(&webhook_url, &text, username).await;
        Ok(outcome(Some(webhook_url), result))
    }

    async fn send_telegram(
        &self,
        scope: ResolvedScope,
        settings: &SettingsMap,
        event: &DispatchEvent,
    ) -> Result<ChannelOutcome, DomainError> {
        let outcome = |target: Option<String>, result| ChannelOutcome {
            channel: telegram::CHANNEL,
            target,
            result,
        };

        let content = match self
            .chat_content(scope, settings, NotificationChannel::Telegram, event)
            .await?
        {
            Ok(content) => content,
            Err(reason) => return Ok(outcome(None, DispatchResult::skipped(reason))),
        };

        let token = explicit_or_setting(None, settings, keys::TELEGRAM_BOT_TOKEN);
        let chat_id = explicit_or_setting(
            event.telegram_chat_id.as_deref(),
            settings,
            keys::TELEGRAM_CHAT_ID,
        );
        let (Some(token), Some(chat_id)) = (token, chat_id) else {
            return Ok(outcome(
                None,
                DispatchResult::skipped(SkipReason::MissingCredentials),
            ));
        };

        let text = chat_message(&content.title, &content.message, event.url.as_deref());
        let result = self.telegram.send(&token, &chat_id, &text).await;
        Ok(outcome(Some(chat_id), result))
    }

    /// Applies the template gates for a chat channel.
    ///
    /// The inner `Err` is the reason the channel is skipped: no template of
    /// that channel exists, or the tenant has not activated it.
    async fn chat_content(
        &self,
        scope: ResolvedScope,
        settings: &SettingsMap,
        channel: NotificationChannel,
        event: &DispatchEvent,
    ) -> Result<Result<ChatContent, SkipReason>, DomainError> {
        let template = match self
            .templates
            .find_template(&event.template, channel, scope.user_id)
            .await?
        {
            Some(t) => Some(t),
            None => {
                self.templates
                    .find_template(&event.template, channel, GLOBAL_TEMPLATE_OWNER)
                    .await?
            }
        };
        let Some(template) = template else {
            return Ok(Err(SkipReason::NoTemplate));
        };

        if !self
            .templates
            .is_active(scope.user_id, template.id, channel)
            .await?
        {
            tracing::debug!(
                user_id = scope.user_id,
                template = %event.template,
                channel = channel.as_str(),
                "Template not activated"
            );
            return Ok(Err(SkipReason::NotActivated));
        }

        let lang = settings
            .get(keys::DEFAULT_LANGUAGE)
            .map(String::as_str)
            .unwrap_or(FALLBACK_LANGUAGE);
        let content = match self.templates.find_lang(template.id, lang).await? {
            Some(content) => Some(content),
            None => self.templates.find_lang(template.id, FALLBACK_LANGUAGE).await?,
        };
        let Some(content) = content else {
            return Ok(Err(SkipReason::NoTemplate));
        };

        Ok(Ok(render_chat(
            &content.subject,
            &content.content,
            &event.variables,
        )))
    }
}

fn render_chat(title: &str, message: &str, variables: &BTreeMap<String, String>) -> ChatContent {
    ChatContent {
        title: render(title, variables),
        message: render(message, variables),
    }
}

fn explicit_or_setting(explicit: Option<&str>, settings: &SettingsMap, key: &str) -> Option<String> {
    explicit
        .or_else(|| settings.get(key).map(String::as_str))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn record_all(outcomes: &[ChannelOutcome]) {
    for outcome in outcomes {
        record_dispatch_outcome(outcome.channel, &outcome.result);
    }
}
