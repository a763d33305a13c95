//! Payment gateway descriptor registry.
//!
//! Each gateway is described once by the settings keys it needs. Config
//! extraction, validation and the enabled-gateway listing iterate over the
//! registry instead of branching per gateway.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::setting::SettingsMap;

/// Value an `is_*_enabled` key holds when the gateway is switched on.
pub const ENABLED_VALUE: &str = "on";

/// Static description of a payment gateway's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub enabled_key: &'static str,
    pub required_fields: &'static [&'static str],
}

impl GatewayDescriptor {
    pub fn is_enabled(&self, settings: &SettingsMap) -> bool {
        settings
            .get(self.enabled_key)
            .map(|v| v.trim().eq_ignore_ascii_case(ENABLED_VALUE))
            .unwrap_or(false)
    }

    /// Required fields that are absent or blank.
    pub fn missing_fields(&self, settings: &SettingsMap) -> Vec<&'static str> {
        self.required_fields
            .iter()
            .copied()
            .filter(|field| {
                settings
                    .get(*field)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }
}

/// Errors from gateway configuration checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayConfigError {
    #[error("Unknown payment gateway: {0}")]
    UnknownGateway(String),

    #[error("Payment gateway {0} is disabled")]
    Disabled(&'static str),

    #[error("Payment gateway {gateway} is missing settings: {}", .fields.join(", "))]
    MissingFields {
        gateway: &'static str,
        fields: Vec<&'static str>,
    },
}

pub static GATEWAYS: &[GatewayDescriptor] = &[
    GatewayDescriptor {
        key: "stripe",
        name: "Stripe",
        enabled_key: "is_stripe_enabled",
        required_fields: &["stripe_key", "stripe_secret"],
    },
    GatewayDescriptor {
        key: "paypal",
        name: "PayPal",
        enabled_key: "is_paypal_enabled",
        required_fields: &["paypal_mode", "paypal_client_id", "paypal_secret_key"],
    },
    GatewayDescriptor {
        key: "paystack",
        name: "Paystack",
        enabled_key: "is_paystack_enabled",
        required_fields: &["paystack_public_key", "paystack_secret_key"],
    },
    GatewayDescriptor {
        key: "flutterwave",
        name: "Flutterwave",
        enabled_key: "is_flutterwave_enabled",
        required_fields: &["flutterwave_public_key", "flutterwave_secret_key"],
    },
    GatewayDescriptor {
        key: "razorpay",
        name: "Razorpay",
        enabled_key: "is_razorpay_enabled",
        required_fields: &["razorpay_public_key", "razorpay_secret_key"],
    },
    GatewayDescriptor {
        key: "mercado",
        name: "Mercado Pago",
        enabled_key: "is_mercado_enabled",
        required_fields: &["mercado_mode", "mercado_access_token"],
    },
    GatewayDescriptor {
        key: "mollie",
        name: "Mollie",
        enabled_key: "is_mollie_enabled",
        required_fields: &["mollie_api_key", "mollie_profile_id", "mollie_partner_id"],
    },
    GatewayDescriptor {
        key: "skrill",
        name: "Skrill",
        enabled_key: "is_skrill_enabled",
        required_fields: &["skrill_email"],
    },
    GatewayDescriptor {
        key: "coingate",
        name: "CoinGate",
        enabled_key: "is_coingate_enabled",
        required_fields: &["coingate_mode", "coingate_auth_token"],
    },
    GatewayDescriptor {
        key: "paymentwall",
        name: "Paymentwall",
        enabled_key: "is_paymentwall_enabled",
        required_fields: &["paymentwall_public_key", "paymentwall_private_key"],
    },
    GatewayDescriptor {
        key: "toyyibpay",
        name: "toyyibPay",
        enabled_key: "is_toyyibpay_enabled",
        required_fields: &["toyyibpay_category_code", "toyyibpay_secret_key"],
    },
    GatewayDescriptor {
        key: "payfast",
        name: "PayFast",
        enabled_key: "is_payfast_enabled",
        required_fields: &[
            "payfast_mode",
            "payfast_merchant_id",
            "payfast_merchant_key",
            "payfast_signature",
        ],
    },
    GatewayDescriptor {
        key: "iyzipay",
        name: "Iyzipay",
        enabled_key: "is_iyzipay_enabled",
        required_fields: &["iyzipay_mode", "iyzipay_api_key", "iyzipay_secret_key"],
    },
    GatewayDescriptor {
        key: "paytab",
        name: "PayTabs",
        enabled_key: "is_paytab_enabled",
        required_fields: &["paytab_profile_id", "paytab_server_key", "paytab_region"],
    },
    GatewayDescriptor {
        key: "cashfree",
        name: "Cashfree",
        enabled_key: "is_cashfree_enabled",
        required_fields: &["cashfree_api_key", "cashfree_secret_key"],
    },
    GatewayDescriptor {
        key: "aamarpay",
        name: "aamarPay",
        enabled_key: "is_aamarpay_enabled",
        required_fields: &["aamarpay_store_id", "aamarpay_signature_key"],
    },
    GatewayDescriptor {
        key: "paytr",
        name: "PayTR",
        enabled_key: "is_paytr_enabled",
        required_fields: &["paytr_merchant_id", "paytr_merchant_key", "paytr_merchant_salt"],
    },
    GatewayDescriptor {
        key: "yookassa",
        name: "YooKassa",
        enabled_key: "is_yookassa_enabled",
        required_fields: &["yookassa_shop_id", "yookassa_secret"],
    },
    GatewayDescriptor {
        key: "midtrans",
        name: "Midtrans",
        enabled_key: "is_midtrans_enabled",
        required_fields: &["midtrans_mode", "midtrans_secret"],
    },
    GatewayDescriptor {
        key: "xendit",
        name: "Xendit",
        enabled_key: "is_xendit_enabled",
        required_fields: &["xendit_api_key", "xendit_token"],
    },
    GatewayDescriptor {
        key: "tap",
        name: "Tap",
        enabled_key: "is_tap_enabled",
        required_fields: &["tap_secret_key"],
    },
];

/// Looks up a gateway by key (case-insensitive).
pub fn find_gateway(key: &str) -> Option<&'static GatewayDescriptor> {
    GATEWAYS
        .iter()
        .find(|g| g.key.eq_ignore_ascii_case(key.trim()))
}

/// Checks that a gateway is enabled and has every required field.
pub fn validate_payment_method_config(
    gateway: &str,
    settings: &SettingsMap,
) -> Result<&'static GatewayDescriptor, GatewayConfigError> {
    let descriptor =
        find_gateway(gateway).ok_or_else(|| GatewayConfigError::UnknownGateway(gateway.to_string()))?;

    if !descriptor.is_enabled(settings) {
        return Err(GatewayConfigError::Disabled(descriptor.key));
    }

    let missing = descriptor.missing_fields(settings);
    if !missing.is_empty() {
        return Err(GatewayConfigError::MissingFields {
            gateway: descriptor.key,
            fields: missing,
        });
    }

    Ok(descriptor)
}

/// Extracts the gateway's required fields from resolved payment settings.
pub fn payment_method_config(
    gateway: &str,
    settings: &SettingsMap,
) -> Result<BTreeMap<&'static str, String>, GatewayConfigError> {
    let descriptor = validate_payment_method_config(gateway, settings)?;

    Ok(descriptor
        .required_fields
        .iter()
        .filter_map(|field| settings.get(*field).map(|v| (*field, v.trim().to_string())))
        .collect())
}

/// Gateways that are switched on and fully configured.
pub fn enabled_gateways(settings: &SettingsMap) -> Vec<&'static GatewayDescriptor> {
    GATEWAYS
        .iter()
        .filter(|g| g.is_enabled(settings) && g.missing_fields(settings).is_empty())
        .collect()
}
