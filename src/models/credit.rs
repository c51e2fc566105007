use crate::entities::{TransactionType, credit_entity, transaction_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditResponse {
    pub id: i64,
    pub agent_id: i64,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<credit_entity::Model> for CreditResponse {
    fn from(m: credit_entity::Model) -> Self {
        Self {
            id: m.id,
            agent_id: m.agent_id,
            balance: m.balance,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i64,
    pub credit_id: i64,
    pub transaction_type: TransactionType,
    /// Signed amount: negative for withdrawals
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub payment_id: Option<i64>,
    pub subscription_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction_entity::Model> for TransactionResponse {
    fn from(m: transaction_entity::Model) -> Self {
        Self {
            id: m.id,
            credit_id: m.credit_id,
            transaction_type: m.transaction_type,
            amount: m.amount,
            balance_after: m.balance_after,
            description: m.description,
            payment_id: m.payment_id,
            subscription_id: m.subscription_id,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

/// Largest magnitude a single ledger entry or payment may carry.
pub const MAX_ENTRY_AMOUNT: i64 = 1_000_000_000_000_000;

/// Manual ledger entry by an admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddTransactionRequest {
    /// Signed: positive for deposit, negative for withdrawal
    #[schema(example = 500000)]
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
}

/// Ledger entry to apply. Built by the payment and subscription workflows and
/// by admins through the credit endpoints.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub agent_id: i64,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub payment_id: Option<i64>,
    pub subscription_id: Option<i64>,
}

impl LedgerEntry {
    pub fn deposit(agent_id: i64, amount: i64) -> Self {
        Self {
            agent_id,
            amount,
            transaction_type: TransactionType::Deposit,
            description: None,
            created_by: None,
            payment_id: None,
            subscription_id: None,
        }
    }

    /// `amount` is the positive magnitude to withdraw.
    pub fn withdrawal(agent_id: i64, amount: i64) -> Self {
        Self {
            agent_id,
            amount: amount.saturating_neg(),
            transaction_type: TransactionType::Withdrawal,
            description: None,
            created_by: None,
            payment_id: None,
            subscription_id: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn created_by(mut self, user_id: i64) -> Self {
        self.created_by = Some(user_id);
        self
    }

    pub fn payment(mut self, payment_id: i64) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn subscription(mut self, subscription_id: i64) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceAudit {
    pub agent_id: i64,
    pub balance: i64,
    pub transactions_sum: i64,
    pub consistent: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
