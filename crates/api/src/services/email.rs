//! Templated email delivery.
//!
//! The SMTP relay comes from the tenant's settings and is configured per
//! send. Missing or placeholder relay settings are an error returned to the
//! caller instead of a silent success against a relay that cannot work.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use domain::models::setting::{keys, FALLBACK_LANGUAGE};
use domain::models::{
    DispatchResult, NotificationChannel, NotificationTemplateLang, ResolvedScope, ScopeRequest,
    SendEmailRequest, SettingsMap, SkipReason, TenantContext, GLOBAL_TEMPLATE_OWNER,
};
use domain::services::{SettingsResolver, TemplateStore};
use domain::DomainError;
use shared::template::render;
use shared::url_safety::{check_outbound_host, OutboundPolicy};

use crate::config::EmailConfig;

pub const CHANNEL: &str = "email";

/// Hosts and domains left over from sample configuration.
const PLACEHOLDER_HOSTS: &[&str] = &["example.com", "localhost"];

const DEFAULT_SMTP_PORT: u16 = 587;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email is not configured: {0}")]
    NotConfigured(String),

    #[error("Email settings still contain placeholder values: {0}")]
    PlaceholderSettings(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Email template not found: {0}")]
    TemplateNotFound(String),

    #[error(transparent)]
    Settings(#[from] DomainError),
}

/// Relay settings read from the tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `tls` (STARTTLS), `ssl` (implicit TLS), or anything else for plain.
    pub encryption: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl SmtpSettings {
    /// Reads and checks the relay settings.
    pub fn from_settings(settings: &SettingsMap) -> Result<Self, EmailError> {
        let value = |key: &str| {
            settings
                .get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let host = value(keys::MAIL_HOST);
        if host.is_empty() {
            return Err(EmailError::NotConfigured("mail host is not set".to_string()));
        }
        if is_placeholder_host(&host) {
            return Err(EmailError::PlaceholderSettings(format!("mail host {}", host)));
        }

        let port = match value(keys::MAIL_PORT).as_str() {
            "" => DEFAULT_SMTP_PORT,
            raw => raw.parse::<u16>().map_err(|_| {
                EmailError::NotConfigured(format!("mail port '{}' is not a number", raw))
            })?,
        };

        Ok(Self {
            host,
            port,
            username: value(keys::MAIL_USERNAME),
            password: value(keys::MAIL_PASSWORD),
            encryption: value(keys::MAIL_ENCRYPTION).to_ascii_lowercase(),
        })
    }
}

fn is_placeholder_host(host: &str) -> bool {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    PLACEHOLDER_HOSTS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{}", p)))
}

/// A rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from_address: String,
    pub from_name: String,
    pub subject: String,
    pub body_html: String,
}

/// Delivers rendered messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Whether tenant relay settings are needed.
    fn requires_relay(&self) -> bool {
        true
    }

    /// Returns the relay's reply code on acceptance.
    async fn deliver(
        &self,
        relay: Option<&SmtpSettings>,
        message: &EmailMessage,
    ) -> Result<u16, String>;
}

/// Sends through the tenant's SMTP relay with lettre.
pub struct SmtpMailTransport {
    timeout: Duration,
}

impl SmtpMailTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build_message(message: &EmailMessage) -> Result<Message, String> {
        let from_address: Address = message
            .from_address
            .parse()
            .map_err(|e| format!("invalid sender address: {}", e))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| format!("invalid recipient address: {}", e))?;

        let from_name = (!message.from_name.is_empty()).then(|| message.from_name.clone());

        Message::builder()
            .from(Mailbox::new(from_name, from_address))
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.body_html.clone())
            .map_err(|e| format!("failed to build message: {}", e))
    }

    fn build_transport(
        &self,
        relay: &SmtpSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let builder = match relay.encryption.as_str() {
            "ssl" => AsyncSmtpTransport::<Tokio1Executor>::relay(&relay.host)
                .map_err(|e| e.to_string())?,
            "tls" | "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay.host)
                .map_err(|e| e.to_string())?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&relay.host),
        };

        let mut builder = builder.port(relay.port).timeout(Some(self.timeout));
        if !relay.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                relay.username.clone(),
                relay.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(
        &self,
        relay: Option<&SmtpSettings>,
        message: &EmailMessage,
    ) -> Result<u16, String> {
        let relay = relay.ok_or_else(|| "no SMTP relay configured".to_string())?;
        let email = Self::build_message(message)?;
        let transport = self.build_transport(relay)?;

        let response = transport.send(email).await.map_err(|e| e.to_string())?;
        Ok(response.code().to_string().parse().unwrap_or(250))
    }
}

/// Logs messages instead of sending them. Development only.
pub struct ConsoleMailTransport;

#[async_trait]
impl MailTransport for ConsoleMailTransport {
    fn requires_relay(&self) -> bool {
        false
    }

    async fn deliver(
        &self,
        _relay: Option<&SmtpSettings>,
        message: &EmailMessage,
    ) -> Result<u16, String> {
        info!(
            provider = "console",
            to = %message.to,
            from = %message.from_address,
            subject = %message.subject,
            "Email (console provider):\n{}",
            message.body_html
        );
        Ok(250)
    }
}

/// Picks the transport named by `email.provider`.
pub fn transport_for(config: &EmailConfig, timeout: Duration) -> Arc<dyn MailTransport> {
    match config.provider.as_str() {
        "console" => Arc::new(ConsoleMailTransport),
        _ => Arc::new(SmtpMailTransport::new(timeout)),
    }
}

pub struct EmailSender {
    resolver: Arc<SettingsResolver>,
    templates: Arc<dyn TemplateStore>,
    transport: Arc<dyn MailTransport>,
    defaults: EmailConfig,
    policy: OutboundPolicy,
}

impl EmailSender {
    pub fn new(
        resolver: Arc<SettingsResolver>,
        templates: Arc<dyn TemplateStore>,
        transport: Arc<dyn MailTransport>,
        defaults: EmailConfig,
        policy: OutboundPolicy,
    ) -> Self {
        Self {
            resolver,
            templates,
            transport,
            defaults,
            policy,
        }
    }

    /// Renders the named email template for the tenant and sends it once.
    ///
    /// Returns `Rejected` without connecting when the relay host fails the
    /// outbound safety check, and `Failed` when the relay refuses the
    /// message.
    pub async fn send_templated(
        &self,
        ctx: &TenantContext,
        scope: ScopeRequest,
        request: &SendEmailRequest,
    ) -> Result<DispatchResult, EmailError> {
        request
            .to
            .trim()
            .parse::<Address>()
            .map_err(|e| EmailError::InvalidAddress(format!("{}: {}", request.to, e)))?;

        let Some(resolved) = self.resolver.resolve_scope(ctx, scope).await? else {
            return Ok(DispatchResult::skipped(SkipReason::Bootstrapping));
        };
        let settings = self.resolver.all(ctx, scope).await?;

        let lang = request
            .lang
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .or_else(|| settings.get(keys::DEFAULT_LANGUAGE).map(String::as_str))
            .unwrap_or(FALLBACK_LANGUAGE)
            .to_string();

        let content = self.template_content(resolved, &request.template, &lang).await?;

        let relay = if self.transport.requires_relay() {
            Some(SmtpSettings::from_settings(&settings)?)
        } else {
            None
        };

        let from_address = settings
            .get(keys::MAIL_FROM_ADDRESS)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or(self.defaults.sender_email.as_str())
            .to_string();
        if relay.is_some() {
            if let Some(domain) = from_address.rsplit('@').next() {
                if is_placeholder_host(domain) {
                    return Err(EmailError::PlaceholderSettings(format!(
                        "sender address {}",
                        from_address
                    )));
                }
            }
        }

        let variables = self.variables(&settings, &request.variables);
        let from_name = content
            .from
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(|f| render(f, &variables))
            .or_else(|| settings.get(keys::MAIL_FROM_NAME).cloned())
            .unwrap_or_else(|| self.defaults.sender_name.clone());

        let message = EmailMessage {
            to: request.to.clone(),
            from_address,
            from_name,
            subject: render(&content.subject, &variables),
            body_html: render(&content.content, &variables),
        };

        if let Some(relay) = &relay {
            if let Err(reason) = check_outbound_host(&relay.host, relay.port, self.policy).await {
                warn!(
                    channel = CHANNEL,
                    smtp_host = %relay.host,
                    reason = %reason,
                    "SMTP relay blocked by URL safety check"
                );
                return Ok(DispatchResult::Rejected {
                    url: format!("smtp://{}:{}", relay.host, relay.port),
                });
            }
        }

        match self.transport.deliver(relay.as_ref(), &message).await {
            Ok(status) => {
                info!(
                    channel = CHANNEL,
                    to = %message.to,
                    template = %request.template,
                    lang = %content.lang,
                    status_code = status,
                    "Email delivered"
                );
                Ok(DispatchResult::Delivered { status })
            }
            Err(error) => {
                warn!(
                    channel = CHANNEL,
                    to = %message.to,
                    template = %request.template,
                    error = %error,
                    "Email delivery failed"
                );
                Ok(DispatchResult::Failed {
                    status: None,
                    error,
                })
            }
        }
    }

    /// Language variant of the tenant's template, falling back to the
    /// global template and then to English.
    async fn template_content(
        &self,
        scope: ResolvedScope,
        name: &str,
        lang: &str,
    ) -> Result<NotificationTemplateLang, EmailError> {
        let template = match self
            .templates
            .find_template(name, NotificationChannel::Email, scope.user_id)
            .await
            .map_err(DomainError::from)?
        {
            Some(t) => t,
            None => self
                .templates
                .find_template(name, NotificationChannel::Email, GLOBAL_TEMPLATE_OWNER)
                .await
                .map_err(DomainError::from)?
                .ok_or_else(|| EmailError::TemplateNotFound(name.to_string()))?,
        };

        if let Some(content) = self
            .templates
            .find_lang(template.id, lang)
            .await
            .map_err(DomainError::from)?
        {
            return Ok(content);
        }

        self.templates
            .find_lang(template.id, FALLBACK_LANGUAGE)
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| EmailError::TemplateNotFound(format!("{} ({})", name, lang)))
    }

    fn variables(
        &self,
        settings: &SettingsMap,
        requested: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut variables = requested.clone();
        variables
            .entry("{app_name}".to_string())
            .or_insert_with(|| {
                settings
                    .get(keys::APP_NAME)
                    .cloned()
                    .unwrap_or_else(|| self.defaults.sender_name.clone())
            });
        variables
    }
}
