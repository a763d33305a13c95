//! Integration tests for settings, payment and admin endpoints.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{
    test_config, TestApp, COMPANY_ID, MEMBER_ID, OTHER_COMPANY_ID, SUPER_ADMIN_ID,
};
use domain::models::TenantMode;
use serde_json::json;

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_settings_round_trip() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/v1/settings",
            Some(COMPANY_ID),
            Some(json!({"settings": {"app_name": "Acme", "defaultLanguage": "de"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["scope"]["user_id"], COMPANY_ID);

    let (status, body) = app
        .json(Method::GET, "/api/v1/settings", Some(COMPANY_ID), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["app_name"], "Acme");
    assert_eq!(body["settings"]["defaultLanguage"], "de");
}

#[tokio::test]
async fn test_default_language_is_backfilled() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/settings", Some(COMPANY_ID), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["defaultLanguage"], "en");
}

#[tokio::test]
async fn test_member_reads_company_settings_but_cannot_write() {
    let app = TestApp::saas().await;
    app.json(
        Method::PUT,
        "/api/v1/settings",
        Some(COMPANY_ID),
        Some(json!({"settings": {"app_name": "Acme"}})),
    )
    .await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/settings", Some(MEMBER_ID), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scope"]["user_id"], COMPANY_ID);
    assert_eq!(body["settings"]["app_name"], "Acme");

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/v1/settings",
            Some(MEMBER_ID),
            Some(json!({"settings": {"app_name": "Hijacked"}})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_member_sees_credentials_masked() {
    let app = TestApp::saas().await;
    app.json(
        Method::PUT,
        "/api/v1/settings",
        Some(COMPANY_ID),
        Some(json!({"settings": {"mail_password": "hunter2", "telegram_bot_token": "123:abc"}})),
    )
    .await;

    let (_, body) = app
        .json(Method::GET, "/api/v1/settings", Some(MEMBER_ID), None)
        .await;
    assert_eq!(body["settings"]["mail_password"], "********");
    assert_eq!(body["settings"]["telegram_bot_token"], "********");
    assert!(!body.to_string().contains("hunter2"));

    let (_, body) = app
        .json(Method::GET, "/api/v1/settings", Some(COMPANY_ID), None)
        .await;
    assert_eq!(body["settings"]["mail_password"], "hunter2");
}

#[tokio::test]
async fn test_companies_do_not_see_each_other() {
    let app = TestApp::saas().await;
    app.json(
        Method::PUT,
        "/api/v1/settings",
        Some(COMPANY_ID),
        Some(json!({"settings": {"app_name": "Acme"}})),
    )
    .await;

    let (_, body) = app
        .json(Method::GET, "/api/v1/settings", Some(OTHER_COMPANY_ID), None)
        .await;

    assert_eq!(body["scope"]["user_id"], OTHER_COMPANY_ID);
    assert!(body["settings"].get("app_name").is_none());
}

#[tokio::test]
async fn test_empty_settings_update_is_rejected() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/v1/settings",
            Some(COMPANY_ID),
            Some(json!({"settings": {}})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_single_tenant_resolution_is_stable() {
    let app = TestApp::new(test_config(
        TenantMode::SingleTenant,
        "https://api.telegram.org",
    ))
    .await;

    let (status, first) = app
        .json(Method::GET, "/api/v1/settings", Some(COMPANY_ID), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app
        .json(Method::GET, "/api/v1/settings", Some(COMPANY_ID), None)
        .await;
    assert_eq!(first["scope"], second["scope"]);

    // The super admin writes into the same single tenant scope.
    let (status, written) = app
        .json(
            Method::PUT,
            "/api/v1/settings",
            Some(SUPER_ADMIN_ID),
            Some(json!({"settings": {"app_name": "Solo"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", written);
    assert_eq!(written["scope"]["user_id"], COMPANY_ID);

    let (_, body) = app
        .json(Method::GET, "/api/v1/settings", Some(MEMBER_ID), None)
        .await;
    assert_eq!(body["settings"]["app_name"], "Solo");
}

#[tokio::test]
async fn test_settings_require_token() {
    let app = TestApp::saas().await;

    let (status, body) = app.json(Method::GET, "/api/v1/settings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let request = Request::builder()
        .uri("/api/v1/settings")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let app = TestApp::saas().await;

    let (status, _) = app.json(Method::GET, "/api/v1/settings", Some(999), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Payments
// ============================================================================

async fn redirect_location(app: &TestApp, target: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(format!("/api/v1/payments/redirect?url={}", target))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (response.status(), location)
}

#[tokio::test]
async fn test_payment_redirect_allows_provider_domains() {
    let app = TestApp::saas().await;

    let (status, location) = redirect_location(&app, "https://checkout.tap.company/pay").await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location, "https://checkout.tap.company/pay");
}

#[tokio::test]
async fn test_payment_redirect_allows_own_app() {
    let app = TestApp::saas().await;

    let (status, location) = redirect_location(&app, "https://app.taskly.test/billing").await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location, "https://app.taskly.test/billing");
}

#[tokio::test]
async fn test_payment_redirect_blocks_other_hosts() {
    let app = TestApp::saas().await;

    for target in [
        "https://evil.com/phish",
        "https://tap.company.evil.com/x",
        "javascript:alert(1)",
        "http://192.168.1.10/",
    ] {
        let (status, location) = redirect_location(&app, target).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{}", target);
        assert_eq!(
            location, "https://app.taskly.test/?error=unsafe_redirect",
            "{}",
            target
        );
    }
}

#[tokio::test]
async fn test_payment_redirect_strips_header_injection() {
    let app = TestApp::saas().await;

    let (status, location) = redirect_location(
        &app,
        "https%3A%2F%2Fcheckout.stripe.com%2Fpay%0D%0ASet-Cookie%3A%20x%3D1",
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(location.starts_with("https://checkout.stripe.com/pay"), "{}", location);
    assert!(!location.contains('\r') && !location.contains('\n'));
}

#[tokio::test]
async fn test_company_falls_back_to_super_admin_gateways() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/v1/payment-settings",
            Some(SUPER_ADMIN_ID),
            Some(json!({"settings": {
                "is_stripe_enabled": "on",
                "stripe_key": "pk_test",
                "stripe_secret": "sk_test"
            }})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = app
        .json(
            Method::GET,
            "/api/v1/payment-settings/gateways",
            Some(COMPANY_ID),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gateways"], json!([{"key": "stripe", "name": "Stripe"}]));
    assert!(!body.to_string().contains("sk_test"));
}

#[tokio::test]
async fn test_incomplete_gateway_is_not_listed() {
    let app = TestApp::saas().await;

    app.json(
        Method::PUT,
        "/api/v1/payment-settings",
        Some(COMPANY_ID),
        Some(json!({"settings": {"is_stripe_enabled": "on", "stripe_key": "pk_test"}})),
    )
    .await;

    let (_, body) = app
        .json(
            Method::GET,
            "/api/v1/payment-settings/gateways",
            Some(COMPANY_ID),
            None,
        )
        .await;
    assert_eq!(body["gateways"], json!([]));
}

// ============================================================================
// Templates and provisioning
// ============================================================================

#[tokio::test]
async fn test_templates_listed_inactive_by_default() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/notification-templates", Some(COMPANY_ID), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert!(data.iter().all(|t| t["is_active"] == false));
}

#[tokio::test]
async fn test_provision_requires_super_admin() {
    let app = TestApp::saas().await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/admin/tenants/{}/provision", COMPANY_ID),
            Some(COMPANY_ID),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_provision_copies_templates_once() {
    let app = TestApp::saas().await;
    let uri = format!("/api/v1/admin/tenants/{}/provision", COMPANY_ID);

    let (status, body) = app.json(Method::POST, &uri, Some(SUPER_ADMIN_ID), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["copied"], 3);

    let (_, body) = app.json(Method::POST, &uri, Some(SUPER_ADMIN_ID), None).await;
    assert_eq!(body["copied"], 0);

    // The tenant's copies shadow the globals.
    let (_, body) = app
        .json(Method::GET, "/api/v1/notification-templates", Some(COMPANY_ID), None)
        .await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert!(data.iter().all(|t| t["created_by"] == COMPANY_ID));
}

#[tokio::test]
async fn test_provision_unknown_user_is_not_found() {
    let app = TestApp::saas().await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/admin/tenants/999/provision",
            Some(SUPER_ADMIN_ID),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_without_database() {
    let app = TestApp::saas().await;

    let request = Request::builder()
        .uri("/api/health")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-123"
    );
    let body = common::parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["configured"], false);
}
