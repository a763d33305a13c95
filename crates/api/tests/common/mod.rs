//! Common test utilities for integration tests.
//!
//! The router runs against in-memory stores with a fixed set of accounts:
//! a super admin, a company, a member of that company and a second company.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use domain::models::{
    NotificationChannel, NotificationTemplate, NotificationTemplateLang, TenantMode, User,
    UserRole, GLOBAL_TEMPLATE_OWNER,
};
use domain::services::InMemoryStore;
use taskly_dispatch_api::app::{create_app, AppState, Stores};
use taskly_dispatch_api::config::{
    Config, DatabaseConfig, EmailConfig, JwtAuthConfig, LoggingConfig, OutboundConfig,
    ServerConfig, SettingsCacheConfig, TenancyConfig,
};
use taskly_dispatch_api::services::email::ConsoleMailTransport;

pub const SUPER_ADMIN_ID: i64 = GLOBAL_TEMPLATE_OWNER;
pub const COMPANY_ID: i64 = 2;
pub const MEMBER_ID: i64 = 3;
pub const OTHER_COMPANY_ID: i64 = 4;

pub const SLACK_TEMPLATE_ID: i64 = 11;
pub const TELEGRAM_TEMPLATE_ID: i64 = 12;
pub const EMAIL_TEMPLATE_ID: i64 = 13;

/// Test configuration. Outbound calls may reach the loopback mock servers.
pub fn test_config(mode: TenantMode, telegram_api_base: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            app_base_url: "https://app.taskly.test".to_string(),
            debug: false,
            cors_origins: vec![],
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        tenancy: TenancyConfig {
            mode,
            installed_marker_path: String::new(),
        },
        outbound: OutboundConfig {
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            telegram_api_base: telegram_api_base.to_string(),
            allow_private_network: true,
        },
        settings: SettingsCacheConfig {
            cache_ttl_secs: 300,
            cache_capacity: 1000,
        },
        email: EmailConfig {
            provider: "console".to_string(),
            sender_email: "noreply@taskly.test".to_string(),
            sender_name: "Taskly".to_string(),
        },
        jwt: JwtAuthConfig {
            secret: "integration-test-secret".to_string(),
            private_key: String::new(),
            public_key: String::new(),
            access_token_expiry_secs: 3600,
            leeway_secs: 30,
        },
    }
}

fn user(id: i64, role: UserRole, created_by: Option<i64>) -> User {
    User {
        id,
        name: format!("user{}", id),
        email: format!("user{}@taskly.test", id),
        role,
        created_by,
        current_workspace_id: None,
        lang: None,
    }
}

fn template(id: i64, name: &str, channel: NotificationChannel) -> NotificationTemplate {
    NotificationTemplate {
        id,
        name: name.to_string(),
        channel,
        created_by: GLOBAL_TEMPLATE_OWNER,
    }
}

fn content(template_id: i64, subject: &str, body: &str) -> NotificationTemplateLang {
    NotificationTemplateLang {
        template_id,
        lang: "en".to_string(),
        subject: subject.to_string(),
        from: None,
        content: body.to_string(),
    }
}

/// Accounts and global templates every test starts with.
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    store.add_user(user(SUPER_ADMIN_ID, UserRole::SuperAdmin, None)).await;
    store.add_user(user(COMPANY_ID, UserRole::Company, Some(SUPER_ADMIN_ID))).await;
    store.add_user(user(MEMBER_ID, UserRole::Member, Some(COMPANY_ID))).await;
    store.add_user(user(OTHER_COMPANY_ID, UserRole::Company, Some(SUPER_ADMIN_ID))).await;

    store
        .add_template(
            template(SLACK_TEMPLATE_ID, "New Task", NotificationChannel::Slack),
            vec![content(SLACK_TEMPLATE_ID, "New Task: {task_name}", "{task_name} was created")],
        )
        .await;
    store
        .add_template(
            template(TELEGRAM_TEMPLATE_ID, "New Task", NotificationChannel::Telegram),
            vec![content(TELEGRAM_TEMPLATE_ID, "New Task: {task_name}", "{task_name} was created")],
        )
        .await;
    store
        .add_template(
            template(EMAIL_TEMPLATE_ID, "Welcome", NotificationChannel::Email),
            vec![content(EMAIL_TEMPLATE_ID, "Welcome to {app_name}", "Hi {name}")],
        )
        .await;

    store
}

/// Router plus handles to its state and store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub async fn new(config: Config) -> Self {
        let store = seeded_store().await;
        let state = AppState::build(
            config,
            None,
            Stores::in_memory(store.clone()),
            Arc::new(ConsoleMailTransport),
        )
        .expect("Failed to build test state");

        Self {
            router: create_app(state.clone()),
            state,
            store,
        }
    }

    pub async fn saas() -> Self {
        Self::new(test_config(TenantMode::Saas, "https://api.telegram.org")).await
    }

    pub fn token(&self, user_id: i64) -> String {
        self.state
            .jwt
            .generate_access_token(user_id)
            .expect("Failed to generate token")
            .0
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, parse_response_body(response).await)
    }
}

/// Parses a response body as JSON; an empty body becomes `null`.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!("Failed to parse response body: {:?}", String::from_utf8_lossy(&body))
    })
}
