//! Typed Commerce billing endpoints
//!
//! Thin wrappers over [`CommerceClient::request`]. Failure handling is fixed
//! per endpoint:
//!
//! - mutations and must-exist reads return `Err`
//! - single-item lookups (`get_subscription`, `get_plan`) return `None`
//! - panel reads (invoices, payment methods, usage, spend alerts, credit
//!   grants and balance, meters, user subscriptions) log the failure at
//!   `warn` and return an empty value
//!
//! Each call uses the client's bearer token. For a one-off token, go through
//! [`CommerceClient::authorized`] (`client.authorized(Some(tok)).get_plans()`)
//! or pass [`ApiRequest::token`] to [`CommerceClient::request`].

use tracing::warn;

use crate::client::{ApiRequest, CommerceClient};
use crate::error::Result;
use crate::types::{
    Balance, CreateSpendAlertRequest, CreditBalance, CreditGrant, DepositRequest, DiscountCode,
    Invoice, Meter, MeterEventsSummary, Pagination, PaymentMethod, Plan, PortalOverview,
    SpendAlert, SubscribeRequest, Subscription, Transaction, TransactionQuery,
    UpdateSpendAlertRequest, UpdateSubscriptionRequest, UsageSummary,
};

const BALANCE: &str = "/api/v1/billing/balance";
const DEPOSIT: &str = "/api/v1/billing/deposit";
const CREDIT: &str = "/api/v1/billing/credit";
const TRANSACTIONS: &str = "/api/v1/billing/transactions";
const SUBSCRIBE: &str = "/api/v1/subscribe";
const PLAN: &str = "/api/v1/plan";
const INVOICES: &str = "/api/v1/billing/invoices";
const PAYMENT_METHODS: &str = "/api/v1/billing/payment-methods";
const USAGE: &str = "/api/v1/billing/usage";
const SPEND_ALERTS: &str = "/api/v1/billing/spend-alerts";
const DISCOUNT_VALIDATE: &str = "/api/v1/billing/discount/validate";
const CREDIT_GRANTS: &str = "/api/v1/billing/credit-grants";
const CREDIT_BALANCE: &str = "/api/v1/billing/credit-balance";
const PORTAL_OVERVIEW: &str = "/api/v1/billing/portal/overview";
const METERS: &str = "/api/v1/billing/meters";
const METER_EVENTS_SUMMARY: &str = "/api/v1/billing/meter-events/summary";

/// Returns the value, or logs the error and returns `fallback()`.
fn or_fallback<T>(endpoint: &'static str, result: Result<T>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(endpoint, status = ?e.status(), error = %e, "Commerce request failed, using empty result");
            fallback()
        }
    }
}

/// Returns the value, or logs the error and returns `None`.
fn or_none<T>(endpoint: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(endpoint, status = ?e.status(), error = %e, "Commerce lookup failed");
            None
        }
    }
}

/// Zero is "unset" for pagination values.
fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}

impl CommerceClient {
    // -----------------------------------------------------------------------
    // Balance
    // -----------------------------------------------------------------------

    /// Balance of `user` in `currency`.
    pub async fn get_balance(&self, user: &str, currency: &str) -> Result<Balance> {
        self.request(
            ApiRequest::get(BALANCE)
                .param("user", user)
                .param("currency", currency),
        )
        .await
    }

    /// Deposits funds for a user.
    pub async fn add_deposit(&self, deposit: &DepositRequest) -> Result<Transaction> {
        self.request(ApiRequest::post(DEPOSIT).json(deposit)?).await
    }

    /// Grants the one-time starter credit to `user`.
    pub async fn grant_starter_credit(&self, user: &str) -> Result<Transaction> {
        self.request(ApiRequest::post(CREDIT).json(&serde_json::json!({ "user": user }))?)
            .await
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Ledger entries for `user`.
    pub async fn get_transactions(
        &self,
        user: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        self.request(
            ApiRequest::get(TRANSACTIONS)
                .param("user", user)
                .param_opt("limit", non_zero(query.limit))
                .param_opt("offset", non_zero(query.offset))
                .param_opt(
                    "currency",
                    query.currency.as_deref().filter(|c| !c.is_empty()),
                ),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Subscribes a user to a plan.
    pub async fn subscribe(&self, subscribe: &SubscribeRequest) -> Result<Subscription> {
        self.request(ApiRequest::post(SUBSCRIBE).json(subscribe)?).await
    }

    /// Looks up a subscription. `None` on any failure.
    pub async fn get_subscription(&self, subscription_id: &str) -> Option<Subscription> {
        or_none(
            "get_subscription",
            self.request(ApiRequest::get(SUBSCRIBE).segment(subscription_id))
                .await,
        )
    }

    /// Subscriptions of `user_id`. Empty on any failure.
    pub async fn get_user_subscriptions(&self, user_id: &str) -> Vec<Subscription> {
        or_fallback(
            "get_user_subscriptions",
            self.request(ApiRequest::get(SUBSCRIBE).param("userId", user_id))
                .await,
            Vec::new,
        )
    }

    /// Cancels a subscription. The response body is ignored.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        self.request_empty(ApiRequest::delete(SUBSCRIBE).segment(subscription_id))
            .await
    }

    /// Moves a subscription to another plan.
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        update: &UpdateSubscriptionRequest,
    ) -> Result<Subscription> {
        self.request(
            ApiRequest::patch(SUBSCRIBE)
                .segment(subscription_id)
                .json(update)?,
        )
        .await
    }

    /// Applies a promotion code to a subscription.
    pub async fn apply_discount(&self, subscription_id: &str, code: &str) -> Result<DiscountCode> {
        self.request(
            ApiRequest::post(SUBSCRIBE)
                .segment(subscription_id)
                .segment("promotion")
                .json(&serde_json::json!({ "code": code }))?,
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    /// All plans.
    pub async fn get_plans(&self) -> Result<Vec<Plan>> {
        self.request(ApiRequest::get(PLAN)).await
    }

    /// Looks up a plan. `None` on any failure.
    pub async fn get_plan(&self, plan_id: &str) -> Option<Plan> {
        or_none(
            "get_plan",
            self.request(ApiRequest::get(PLAN).segment(plan_id)).await,
        )
    }

    // -----------------------------------------------------------------------
    // Invoices
    // -----------------------------------------------------------------------

    /// Invoices of `user_id`. Empty on any failure.
    pub async fn get_invoices(&self, user_id: &str, page: Pagination) -> Vec<Invoice> {
        or_fallback(
            "get_invoices",
            self.request(
                ApiRequest::get(INVOICES)
                    .param("user", user_id)
                    .param_opt("limit", non_zero(page.limit))
                    .param_opt("offset", non_zero(page.offset)),
            )
            .await,
            Vec::new,
        )
    }

    // -----------------------------------------------------------------------
    // Payment methods
    // -----------------------------------------------------------------------

    /// Payment methods of `user_id`. Empty on any failure.
    pub async fn get_payment_methods(&self, user_id: &str) -> Vec<PaymentMethod> {
        or_fallback(
            "get_payment_methods",
            self.request(ApiRequest::get(PAYMENT_METHODS).param("user", user_id))
                .await,
            Vec::new,
        )
    }

    /// Stores a new payment method.
    pub async fn add_payment_method(&self, method: &PaymentMethod) -> Result<PaymentMethod> {
        self.request(ApiRequest::post(PAYMENT_METHODS).json(method)?)
            .await
    }

    /// Deletes a payment method. The response body is ignored.
    pub async fn remove_payment_method(&self, method_id: &str) -> Result<()> {
        self.request_empty(ApiRequest::delete(PAYMENT_METHODS).segment(method_id))
            .await
    }

    /// Makes a payment method the default. The response body is ignored.
    pub async fn set_default_payment_method(&self, method_id: &str) -> Result<()> {
        self.request_empty(
            ApiRequest::post(PAYMENT_METHODS)
                .segment(method_id)
                .segment("default"),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Usage
    // -----------------------------------------------------------------------

    /// Usage of `user_id` this period. Zero usage on any failure.
    pub async fn get_usage(&self, user_id: &str) -> UsageSummary {
        or_fallback(
            "get_usage",
            self.request(ApiRequest::get(USAGE).param("user", user_id))
                .await,
            UsageSummary::default,
        )
    }

    // -----------------------------------------------------------------------
    // Spend alerts
    // -----------------------------------------------------------------------

    /// Spend alerts of `user_id`. Empty on any failure.
    pub async fn get_spend_alerts(&self, user_id: &str) -> Vec<SpendAlert> {
        or_fallback(
            "get_spend_alerts",
            self.request(ApiRequest::get(SPEND_ALERTS).param("user", user_id))
                .await,
            Vec::new,
        )
    }

    /// Creates a spend alert.
    pub async fn create_spend_alert(&self, alert: &CreateSpendAlertRequest) -> Result<SpendAlert> {
        self.request(ApiRequest::post(SPEND_ALERTS).json(alert)?)
            .await
    }

    /// Updates a spend alert.
    pub async fn update_spend_alert(
        &self,
        alert_id: &str,
        update: &UpdateSpendAlertRequest,
    ) -> Result<SpendAlert> {
        self.request(
            ApiRequest::patch(SPEND_ALERTS)
                .segment(alert_id)
                .json(update)?,
        )
        .await
    }

    /// Deletes a spend alert. The response body is ignored.
    pub async fn delete_spend_alert(&self, alert_id: &str) -> Result<()> {
        self.request_empty(ApiRequest::delete(SPEND_ALERTS).segment(alert_id))
            .await
    }

    // -----------------------------------------------------------------------
    // Discount codes
    // -----------------------------------------------------------------------

    /// Checks a promotion code.
    pub async fn validate_discount_code(&self, code: &str) -> Result<DiscountCode> {
        self.request(ApiRequest::get(DISCOUNT_VALIDATE).param("code", code))
            .await
    }

    // -----------------------------------------------------------------------
    // Credits
    // -----------------------------------------------------------------------

    /// Credit grants of `user_id`. Empty on any failure.
    pub async fn get_credit_grants(&self, user_id: &str) -> Vec<CreditGrant> {
        or_fallback(
            "get_credit_grants",
            self.request(ApiRequest::get(CREDIT_GRANTS).param("userId", user_id))
                .await,
            Vec::new,
        )
    }

    /// Credit balance of `user_id`. No balances on any failure.
    pub async fn get_credit_balance(&self, user_id: &str) -> CreditBalance {
        or_fallback(
            "get_credit_balance",
            self.request(ApiRequest::get(CREDIT_BALANCE).param("userId", user_id))
                .await,
            || CreditBalance::empty(user_id),
        )
    }

    // -----------------------------------------------------------------------
    // Portal
    // -----------------------------------------------------------------------

    /// Billing portal summary for `customer_id`.
    pub async fn get_portal_overview(&self, customer_id: &str) -> Result<PortalOverview> {
        self.request(ApiRequest::get(PORTAL_OVERVIEW).param("customerId", customer_id))
            .await
    }

    // -----------------------------------------------------------------------
    // Meters
    // -----------------------------------------------------------------------

    /// All meter definitions. Empty on any failure.
    pub async fn get_meters(&self) -> Vec<Meter> {
        or_fallback(
            "get_meters",
            self.request(ApiRequest::get(METERS)).await,
            Vec::new,
        )
    }

    /// Per-meter totals for `user_id`. Empty on any failure.
    pub async fn get_meter_events_summary(&self, user_id: &str) -> MeterEventsSummary {
        or_fallback(
            "get_meter_events_summary",
            self.request(ApiRequest::get(METER_EVENTS_SUMMARY).param("userId", user_id))
                .await,
            || MeterEventsSummary::empty(user_id),
        )
    }
}
