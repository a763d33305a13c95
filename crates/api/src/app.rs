use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    InMemoryStore, SettingsResolver, SettingsStore, TemplateStore, UserDirectory, WebhookStore,
};
use persistence::repositories::{
    NotificationTemplateRepository, SettingRepository, UserRepository, WebhookRepository,
};
use shared::jwt::JwtConfig;

use crate::config::{Config, ConfigValidationError};
use crate::middleware::{
    metrics_handler, metrics_middleware, optional_tenant, require_super_admin, require_tenant,
    trace_id,
};
use crate::routes::{admin, dispatch, health, notification_templates, payments, settings, webhooks};
use crate::services::email::{transport_for, MailTransport};
use crate::services::{
    Dispatcher, EmailSender, OutboundClient, SlackSender, TelegramSender, WebhookSender,
};

/// Storage backends behind the domain traits.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserDirectory>,
    pub settings: Arc<dyn SettingsStore>,
    pub webhooks: Arc<dyn WebhookStore>,
    pub templates: Arc<dyn TemplateStore>,
}

impl Stores {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            settings: Arc::new(SettingRepository::new(pool.clone())),
            webhooks: Arc::new(WebhookRepository::new(pool.clone())),
            templates: Arc::new(NotificationTemplateRepository::new(pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            settings: store.clone(),
            webhooks: store.clone(),
            templates: store,
        }
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error("Failed to build outbound HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when running against in-memory stores.
    pub pool: Option<PgPool>,
    pub jwt: Arc<JwtConfig>,
    pub users: Arc<dyn UserDirectory>,
    pub webhooks: Arc<dyn WebhookStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub resolver: Arc<SettingsResolver>,
    pub dispatcher: Arc<Dispatcher>,
    pub email: Arc<EmailSender>,
}

impl AppState {
    /// Wires the senders and the settings resolver over `stores`.
    pub fn build(
        config: Config,
        pool: Option<PgPool>,
        stores: Stores,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, StateError> {
        let jwt = Arc::new(config.jwt.build()?);
        let outbound = Arc::new(OutboundClient::new(&config.outbound)?);

        let resolver = Arc::new(SettingsResolver::with_cache(
            stores.users.clone(),
            stores.settings.clone(),
            Duration::from_secs(config.settings.cache_ttl_secs),
            config.settings.cache_capacity,
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            resolver.clone(),
            stores.templates.clone(),
            WebhookSender::new(outbound.clone(), stores.webhooks.clone()),
            SlackSender::new(outbound.clone()),
            TelegramSender::new(outbound.clone(), config.outbound.telegram_api_base.clone()),
        ));

        let email = Arc::new(EmailSender::new(
            resolver.clone(),
            stores.templates.clone(),
            transport,
            config.email.clone(),
            outbound.policy(),
        ));

        Ok(Self {
            config: Arc::new(config),
            pool,
            jwt,
            users: stores.users,
            webhooks: stores.webhooks,
            templates: stores.templates,
            resolver,
            dispatcher,
            email,
        })
    }

    /// Production state backed by PostgreSQL and the configured mail provider.
    pub fn postgres(config: Config, pool: PgPool) -> Result<Self, StateError> {
        let stores = Stores::postgres(&pool);
        let transport = transport_for(&config.email, config.outbound.request_timeout());
        Self::build(config, Some(pool), stores, transport)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Tenant routes; the bearer token must name an existing user
    let protected_routes = Router::new()
        .route(
            "/api/v1/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route(
            "/api/v1/payment-settings",
            put(payments::update_payment_settings),
        )
        .route(
            "/api/v1/payment-settings/gateways",
            get(payments::list_gateways),
        )
        .route(
            "/api/v1/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route("/api/v1/webhooks/:webhook_id", delete(webhooks::delete_webhook))
        .route(
            "/api/v1/notification-templates",
            get(notification_templates::list_templates),
        )
        .route(
            "/api/v1/notification-templates/:template_id/activation",
            put(notification_templates::update_activation),
        )
        .route("/api/v1/dispatch", post(dispatch::dispatch_event))
        .route("/api/v1/dispatch/email", post(dispatch::send_email))
        .route("/api/v1/dispatch/calendar", post(dispatch::dispatch_calendar))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_tenant));

    // Super admin only; tenant auth runs first (outermost layer)
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/tenants/:user_id/provision",
            post(admin::provision_tenant),
        )
        .route_layer(middleware::from_fn(require_super_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_tenant));

    // Payment return links arrive from the gateway, usually without a token
    let redirect_routes = Router::new()
        .route("/api/v1/payments/redirect", get(payments::payment_redirect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_tenant,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(redirect_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
