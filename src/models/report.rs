use super::{PaymentResponse, SubscriptionResponse, TransactionResponse};
use crate::entities::PaymentStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReportQuery {
    /// Inclusive, defaults to 30 days before `end_date`
    pub start_date: Option<NaiveDate>,
    /// Inclusive, defaults to today
    pub end_date: Option<NaiveDate>,
    pub agent_id: Option<i64>,
    pub product_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlySales {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminDashboard {
    pub total_agents: u64,
    pub active_agents: u64,
    pub total_products: u64,
    pub active_products: u64,
    pub total_subscriptions: u64,
    pub active_subscriptions: u64,
    pub pending_payments: u64,
    pub total_sales: i64,
    pub monthly_sales: Vec<MonthlySales>,
    pub recent_subscriptions: Vec<SubscriptionResponse>,
    pub recent_payments: Vec<PaymentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentDashboard {
    pub agent_id: i64,
    pub balance: i64,
    pub total_subscriptions: u64,
    pub active_subscriptions: u64,
    /// Active subscriptions ending within the next 7 days
    pub expiring_soon: Vec<SubscriptionResponse>,
    pub total_sales: i64,
    pub monthly_sales: Vec<MonthlySales>,
    pub recent_subscriptions: Vec<SubscriptionResponse>,
    pub recent_transactions: Vec<TransactionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Dashboard {
    Admin(AdminDashboard),
    Agent(AgentDashboard),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductSales {
    pub product_id: i64,
    pub product_name: String,
    pub count: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AgentSales {
    pub agent_id: i64,
    pub agent_name: String,
    pub count: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailySales {
    pub date: NaiveDate,
    pub count: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_count: i64,
    pub total_amount: i64,
    pub by_product: Vec<ProductSales>,
    pub by_agent: Vec<AgentSales>,
    pub by_day: Vec<DailySales>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusSummary {
    pub status: PaymentStatus,
    pub count: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyFinance {
    pub date: NaiveDate,
    pub deposits: i64,
    pub withdrawals: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_deposits: i64,
    /// Magnitude of all withdrawals
    pub total_withdrawals: i64,
    pub net: i64,
    pub payments_by_status: Vec<PaymentStatusSummary>,
    pub by_day: Vec<DailyFinance>,
}
