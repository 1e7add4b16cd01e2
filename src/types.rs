//! Commerce API wire types
//!
//! Response records mirror the JSON the Commerce API returns. Every field is
//! optional and unknown fields are ignored, so a partial or newer payload
//! still deserializes. Request bodies serialize with camelCase names and omit
//! absent optional fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Free-form metadata attached to plans and transactions.
pub type Metadata = HashMap<String, JsonValue>;

// ---------------------------------------------------------------------------
// Balance and transactions
// ---------------------------------------------------------------------------

/// Account balance for one currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Balance {
    /// Total balance
    pub balance: f64,
    /// Amount held by pending operations
    pub holds: f64,
    /// `balance - holds`
    pub available: f64,
}

/// A ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub id: Option<String>,
    pub owner: Option<String>,
    /// `hold`, `hold-removed`, `transfer`, `deposit`, or `withdraw`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub destination_id: Option<String>,
    pub destination_kind: Option<String>,
    pub source_id: Option<String>,
    pub source_kind: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub expires_at: Option<String>,
    pub metadata: Option<Metadata>,
    pub created_at: Option<String>,
}

/// Body of `POST /api/v1/billing/deposit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Credit lifetime, e.g. `"30d"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<String>,
}

/// Optional filters for the transaction listing.
///
/// Zero `limit`/`offset` values are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub currency: Option<String>,
}

/// Optional pagination for list endpoints.
///
/// Zero values are treated as unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Subscriptions and plans
// ---------------------------------------------------------------------------

/// Discount applied to a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionDiscount {
    pub id: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    /// `percent` or `amount`
    pub kind: Option<String>,
    pub value: Option<f64>,
    pub currency: Option<String>,
    /// `forever`, `once`, or `repeating`
    pub duration: Option<String>,
    pub duration_in_months: Option<u32>,
}

/// A plan subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub id: Option<String>,
    pub plan_id: Option<String>,
    pub user_id: Option<String>,
    /// `trialing`, `active`, `past_due`, `canceled`, `unpaid`, ...
    pub status: Option<String>,
    /// `charge_automatically` or `send_invoice`
    pub billing_type: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub trial_start: Option<String>,
    pub trial_end: Option<String>,
    pub quantity: Option<f64>,
    pub created_at: Option<String>,
    pub discount: Option<SubscriptionDiscount>,
}

/// Body of `POST /api/v1/subscribe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub plan_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

/// Body of `PATCH /api/v1/subscribe/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub plan_id: String,
}

/// A purchasable plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    /// `monthly`, `yearly`, ...
    pub interval: Option<String>,
    pub interval_count: Option<u32>,
    pub trial_period_days: Option<u32>,
    pub metadata: Option<Metadata>,
}

/// Promotion code, as validated or applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscountCode {
    pub id: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub duration: Option<String>,
    pub duration_in_months: Option<u32>,
    pub valid: Option<bool>,
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

/// A line on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceItem {
    pub id: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total: Option<f64>,
}

/// An invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub id: Option<String>,
    pub number: Option<String>,
    pub user_id: Option<String>,
    pub subscription_id: Option<String>,
    pub amount: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    /// `paid`, `unpaid`, `failed`, `pending`, `refunded`, `void`, ...
    pub status: Option<String>,
    pub pdf_url: Option<String>,
    pub created_at: Option<String>,
    pub due_at: Option<String>,
    pub items: Option<Vec<InvoiceItem>>,
}

// ---------------------------------------------------------------------------
// Payment methods
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CryptoWallet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaypalAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A stored payment method. Also the body of the add-payment-method call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentMethod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// `card`, `paypal`, `bank_account`, `crypto`, `wire`, ...
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto: Option<CryptoWallet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire: Option<WireDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal: Option<PaypalAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<BankAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_details: Option<BillingDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Usage, alerts, credits, meters
// ---------------------------------------------------------------------------

/// A start/end date range. Both ends are absent in an empty period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Consumption of one metered resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageRecord {
    pub meter_id: Option<String>,
    pub label: Option<String>,
    pub current: Option<f64>,
    pub limit: Option<f64>,
    pub unit: Option<String>,
    pub cost: Option<f64>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
}

/// Usage over the current billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageSummary {
    pub total_cost: f64,
    pub currency: String,
    pub period: Period,
    pub records: Vec<UsageRecord>,
}

impl Default for UsageSummary {
    /// Zero cost in `usd` with an empty period and no records.
    fn default() -> Self {
        Self {
            total_cost: 0.0,
            currency: "usd".to_string(),
            period: Period::default(),
            records: Vec::new(),
        }
    }
}

/// A spend threshold notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpendAlert {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub threshold: Option<f64>,
    pub currency: Option<String>,
    pub triggered_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /api/v1/billing/spend-alerts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpendAlertRequest {
    pub user_id: String,
    pub title: String,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Body of `PATCH /api/v1/billing/spend-alerts/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpendAlertRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Promotional credit granted to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditGrant {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub amount_cents: Option<i64>,
    pub remaining_cents: Option<i64>,
    pub currency: Option<String>,
    pub expires_at: Option<String>,
    pub priority: Option<i32>,
    pub eligibility: Option<Vec<String>>,
    pub tags: Option<String>,
    pub voided: Option<bool>,
    pub active: Option<bool>,
    pub created_at: Option<String>,
}

/// Available credit in one currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencyCredit {
    pub currency: Option<String>,
    pub available: Option<f64>,
}

/// Credit available to a user across currencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditBalance {
    pub user_id: Option<String>,
    pub balances: Vec<CurrencyCredit>,
}

impl CreditBalance {
    /// A balance with no credit for `user_id`.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            balances: Vec::new(),
        }
    }
}

/// A billable meter definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Meter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub aggregation: Option<String>,
    pub created_at: Option<String>,
}

/// Aggregate of one meter's events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeterTotal {
    pub meter_id: Option<String>,
    pub name: Option<String>,
    pub total: Option<f64>,
    pub unit: Option<String>,
    pub dimensions: Option<HashMap<String, f64>>,
}

/// Per-meter totals for a user over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeterEventsSummary {
    pub user_id: Option<String>,
    pub meters: Vec<MeterTotal>,
    pub period: Period,
}

impl MeterEventsSummary {
    /// A summary with no meters and an empty period for `user_id`.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            meters: Vec::new(),
            period: Period::default(),
        }
    }
}

/// Billing portal landing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalOverview {
    pub customer_id: Option<String>,
    pub balance: Option<Balance>,
    pub credit_balance: Option<f64>,
    pub active_subscription: Option<Subscription>,
    pub pending_invoices: Option<u32>,
    pub total_spend_this_period: Option<f64>,
    pub currency: Option<String>,
}
