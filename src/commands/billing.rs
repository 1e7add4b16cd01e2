//! Billing read commands
//!
//! Each command resolves the target user, calls one Commerce API endpoint,
//! and prints either a table or pretty JSON.

use colored::Colorize;
use prettytable::{cell, row, Table};
use serde::Serialize;

use crate::commands::{commerce_client, resolve_user};
use crate::config::Config;
use crate::error::Result;
use crate::types::{
    Invoice, Pagination, Plan, Subscription, Transaction, TransactionQuery, UsageSummary,
};

/// Shows a user's balance.
///
/// # Errors
///
/// Returns an error if no user can be resolved or the request fails.
pub async fn balance(config: &Config, user: Option<String>, currency: &str, json: bool) -> Result<()> {
    let session = config.open_session()?;
    let user = resolve_user(user, &session)?;
    let client = commerce_client(config, &session)?;

    let balance = client.get_balance(&user, currency).await?;
    if json {
        return print_json(&balance);
    }

    println!("\nBalance for {} ({})\n", user, currency.to_uppercase());
    println!("Balance:    {}", format_amount(balance.balance));
    println!("Holds:      {}", format_amount(balance.holds));
    println!("Available:  {}", format_amount(balance.available).bold());
    println!();
    Ok(())
}

/// Lists available plans.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn plans(config: &Config, json: bool) -> Result<()> {
    let session = config.open_session()?;
    let client = commerce_client(config, &session)?;

    let plans = client.get_plans().await?;
    if json {
        return print_json(&plans);
    }
    if plans.is_empty() {
        println!("No plans available");
        return Ok(());
    }

    output_plans_table(&plans);
    Ok(())
}

/// Lists a user's subscriptions.
///
/// # Errors
///
/// Returns an error if no user can be resolved.
pub async fn subscriptions(config: &Config, user: Option<String>, json: bool) -> Result<()> {
    let session = config.open_session()?;
    let user = resolve_user(user, &session)?;
    let client = commerce_client(config, &session)?;

    let subscriptions = client.get_user_subscriptions(&user).await;
    if json {
        return print_json(&subscriptions);
    }
    if subscriptions.is_empty() {
        println!("No subscriptions for {}", user);
        return Ok(());
    }

    output_subscriptions_table(&subscriptions);
    Ok(())
}

/// Lists a user's transactions.
///
/// # Errors
///
/// Returns an error if no user can be resolved or the request fails.
pub async fn transactions(
    config: &Config,
    user: Option<String>,
    query: TransactionQuery,
    json: bool,
) -> Result<()> {
    let session = config.open_session()?;
    let user = resolve_user(user, &session)?;
    let client = commerce_client(config, &session)?;

    let transactions = client.get_transactions(&user, &query).await?;
    if json {
        return print_json(&transactions);
    }
    if transactions.is_empty() {
        println!("No transactions for {}", user);
        return Ok(());
    }

    output_transactions_table(&transactions);
    Ok(())
}

/// Shows a user's usage for the current period.
///
/// # Errors
///
/// Returns an error if no user can be resolved.
pub async fn usage(config: &Config, user: Option<String>, json: bool) -> Result<()> {
    let session = config.open_session()?;
    let user = resolve_user(user, &session)?;
    let client = commerce_client(config, &session)?;

    let usage = client.get_usage(&user).await;
    if json {
        return print_json(&usage);
    }

    output_usage(&usage);
    Ok(())
}

/// Lists a user's invoices.
///
/// # Errors
///
/// Returns an error if no user can be resolved.
pub async fn invoices(
    config: &Config,
    user: Option<String>,
    page: Pagination,
    json: bool,
) -> Result<()> {
    let session = config.open_session()?;
    let user = resolve_user(user, &session)?;
    let client = commerce_client(config, &session)?;

    let invoices = client.get_invoices(&user, page).await;
    if json {
        return print_json(&invoices);
    }
    if invoices.is_empty() {
        println!("No invoices for {}", user);
        return Ok(());
    }

    output_invoices_table(&invoices);
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn output_plans_table(plans: &[Plan]) {
    let mut table = Table::new();
    table.add_row(row!["Plan", "Name", "Price", "Interval", "Trial"]);

    for plan in plans {
        let interval = match (plan.interval.as_deref(), plan.interval_count) {
            (Some(interval), Some(count)) if count > 1 => format!("{} {}s", count, interval),
            (Some(interval), _) => interval.to_string(),
            (None, _) => "-".to_string(),
        };
        let trial = plan
            .trial_period_days
            .filter(|days| *days > 0)
            .map(|days| format!("{} days", days))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(row![
            text(&plan.slug),
            text(&plan.name),
            format_price(plan.price, plan.currency.as_deref()),
            interval,
            trial
        ]);
    }

    println!("\nAvailable plans:\n");
    table.printstd();
    println!();
}

fn output_subscriptions_table(subscriptions: &[Subscription]) {
    let mut table = Table::new();
    table.add_row(row!["Subscription", "Plan", "Status", "Period Ends", "Discount"]);

    for subscription in subscriptions {
        let discount = subscription
            .discount
            .as_ref()
            .and_then(|d| d.code.clone().or_else(|| d.name.clone()))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(row![
            text(&subscription.id),
            text(&subscription.plan_id),
            format_status(subscription.status.as_deref()),
            text(&subscription.period_end),
            discount
        ]);
    }

    println!("\nSubscriptions:\n");
    table.printstd();
    println!();
}

fn output_transactions_table(transactions: &[Transaction]) {
    let mut table = Table::new();
    table.add_row(row!["Transaction", "Type", "Amount", "Currency", "Created"]);

    for transaction in transactions {
        table.add_row(row![
            text(&transaction.id),
            text(&transaction.kind),
            transaction
                .amount
                .map(format_amount)
                .unwrap_or_else(|| "-".to_string()),
            text(&transaction.currency),
            text(&transaction.created_at)
        ]);
    }

    println!("\nTransactions:\n");
    table.printstd();
    println!();
}

fn output_usage(usage: &UsageSummary) {
    println!("\nUsage\n");
    println!(
        "Total cost:  {} {}",
        format_amount(usage.total_cost).bold(),
        usage.currency.to_uppercase()
    );
    if let (Some(start), Some(end)) = (&usage.period.start, &usage.period.end) {
        println!("Period:      {} .. {}", start, end);
    }

    if usage.records.is_empty() {
        println!("\nNo metered usage recorded\n");
        return;
    }

    let mut table = Table::new();
    table.add_row(row!["Meter", "Current", "Limit", "Unit", "Cost"]);
    for record in &usage.records {
        let meter = record.label.clone().or_else(|| record.meter_id.clone());
        table.add_row(row![
            text(&meter),
            record.current.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            record.limit.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            text(&record.unit),
            record.cost.map(format_amount).unwrap_or_else(|| "-".to_string())
        ]);
    }

    println!();
    table.printstd();
    println!();
}

fn output_invoices_table(invoices: &[Invoice]) {
    let mut table = Table::new();
    table.add_row(row!["Invoice", "Status", "Total", "Created", "Due"]);

    for invoice in invoices {
        let number = invoice.number.clone().or_else(|| invoice.id.clone());
        table.add_row(row![
            text(&number),
            format_status(invoice.status.as_deref()),
            format_price(invoice.total.or(invoice.amount), invoice.currency.as_deref()),
            text(&invoice.created_at),
            text(&invoice.due_at)
        ]);
    }

    println!("\nInvoices:\n");
    table.printstd();
    println!();
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

fn format_price(amount: Option<f64>, currency: Option<&str>) -> String {
    match (amount, currency) {
        (Some(amount), Some(currency)) => {
            format!("{} {}", format_amount(amount), currency.to_uppercase())
        }
        (Some(amount), None) => format_amount(amount),
        (None, _) => "-".to_string(),
    }
}

fn format_status(status: Option<&str>) -> String {
    match status {
        Some(s @ ("active" | "paid" | "trialing")) => s.green().to_string(),
        Some(s @ ("canceled" | "cancelled" | "void" | "uncollectible" | "past_due")) => {
            s.red().to_string()
        }
        Some(s) => s.to_string(),
        None => "-".to_string(),
    }
}
