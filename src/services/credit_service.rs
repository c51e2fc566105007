use crate::entities::{
    TransactionType, agent_entity as agents, credit_entity as credits,
    transaction_entity as transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    BalanceAudit, CreditResponse, LedgerEntry, MAX_ENTRY_AMOUNT, PaginatedResponse,
    PaginationParams, TransactionResponse,
};
use crate::services::activity_log::{Activity, record_activity};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;

/// Owns agent balances and their append-only transaction history.
///
/// Every balance change goes through [`apply_entry`], which must run inside a
/// database transaction: it locks the credit row, validates the new balance
/// and writes the balance together with its transaction row.
#[derive(Clone)]
pub struct CreditService {
    pool: DatabaseConnection,
}

impl CreditService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Returns the agent's credit, creating an empty one on first access.
    pub async fn get_or_create_credit(&self, agent_id: i64) -> AppResult<credits::Model> {
        ensure_credit(&self.pool, agent_id).await
    }

    pub async fn get_credit(&self, agent_id: i64) -> AppResult<CreditResponse> {
        Ok(self.get_or_create_credit(agent_id).await?.into())
    }

    /// Applies one ledger entry atomically and returns the updated credit.
    pub async fn add_transaction(&self, entry: LedgerEntry) -> AppResult<credits::Model> {
        let txn = self.pool.begin().await?;
        let (credit, tx) = apply_entry(&txn, &entry).await?;
        if let Some(actor) = entry.created_by
            && entry.payment_id.is_none()
            && entry.subscription_id.is_none()
        {
            record_activity(
                &txn,
                Activity::new(actor, "manual_transaction", "credit", credit.id).details(json!({
                    "agent_id": entry.agent_id,
                    "transaction_id": tx.id,
                    "amount": entry.amount,
                    "type": entry.transaction_type.to_string(),
                })),
            )
            .await?;
        }
        txn.commit().await?;
        Ok(credit)
    }

    /// Newest first. Empty when the agent's credit was never created.
    pub async fn list_transactions(
        &self,
        agent_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let credit = credits::Entity::find()
            .filter(credits::Column::AgentId.eq(agent_id))
            .one(&self.pool)
            .await?;

        let Some(credit) = credit else {
            return Ok(PaginatedResponse::new(Vec::new(), params, 0));
        };

        let query =
            transactions::Entity::find().filter(transactions::Column::CreditId.eq(credit.id));
        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    pub async fn list_credits(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CreditResponse>> {
        let query = credits::Entity::find();
        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_asc(credits::Column::AgentId)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// Recomputes the balance from the transaction rows and compares it with
    /// the cached value.
    pub async fn audit_balance(&self, agent_id: i64) -> AppResult<BalanceAudit> {
        let credit = credits::Entity::find()
            .filter(credits::Column::AgentId.eq(agent_id))
            .one(&self.pool)
            .await?;

        let Some(credit) = credit else {
            agents::Entity::find_by_id(agent_id)
                .one(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;
            return Ok(BalanceAudit {
                agent_id,
                balance: 0,
                transactions_sum: 0,
                consistent: true,
            });
        };

        let transactions_sum = sum_signed_amounts(&self.pool, credit.id).await?;

        Ok(BalanceAudit {
            agent_id,
            balance: credit.balance,
            transactions_sum,
            consistent: transactions_sum == credit.balance,
        })
    }
}

async fn sum_signed_amounts<C: ConnectionTrait>(conn: &C, credit_id: i64) -> AppResult<i64> {
    let amounts: Vec<i64> = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::Amount)
        .filter(transactions::Column::CreditId.eq(credit_id))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(amounts.into_iter().sum())
}

/// Lazily materialises the agent's credit row. Safe under concurrent first
/// access: the unique `agent_id` key turns a racing insert into a no-op.
pub(crate) async fn ensure_credit<C: ConnectionTrait>(
    conn: &C,
    agent_id: i64,
) -> AppResult<credits::Model> {
    if let Some(credit) = credits::Entity::find()
        .filter(credits::Column::AgentId.eq(agent_id))
        .one(conn)
        .await?
    {
        return Ok(credit);
    }

    agents::Entity::find_by_id(agent_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;

    let now = Utc::now();
    credits::Entity::insert(credits::ActiveModel {
        agent_id: Set(agent_id),
        balance: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(credits::Column::AgentId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    credits::Entity::find()
        .filter(credits::Column::AgentId.eq(agent_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::InternalError(format!("Credit for agent {agent_id} vanished")))
}

fn amount_out_of_range() -> AppError {
    AppError::ValidationError("Amount is out of range for this balance".to_string())
}

fn validate_sign(entry: &LedgerEntry) -> AppResult<()> {
    match entry.transaction_type {
        TransactionType::Deposit if entry.amount <= 0 => Err(AppError::ValidationError(
            "Deposit amount must be positive".to_string(),
        )),
        TransactionType::Withdrawal if entry.amount >= 0 => Err(AppError::ValidationError(
            "Withdrawal amount must be negative".to_string(),
        )),
        _ if entry.amount.unsigned_abs() > MAX_ENTRY_AMOUNT.unsigned_abs() => {
            Err(AppError::ValidationError(format!(
                "Amount must not exceed {MAX_ENTRY_AMOUNT}"
            )))
        }
        _ => Ok(()),
    }
}

/// Writes one ledger entry on `conn`, which must be an open transaction.
///
/// The credit row is locked (`SELECT ... FOR UPDATE`) before the balance is
/// read, so concurrent writers against the same agent serialize while other
/// agents are unaffected. On error nothing has been written that the caller's
/// rollback would not undo.
pub(crate) async fn apply_entry<C: ConnectionTrait>(
    conn: &C,
    entry: &LedgerEntry,
) -> AppResult<(credits::Model, transactions::Model)> {
    validate_sign(entry)?;

    let credit_id = ensure_credit(conn, entry.agent_id).await?.id;
    let credit = credits::Entity::find_by_id(credit_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Credit {credit_id} not found")))?;

    let required = entry.amount.checked_neg().ok_or_else(amount_out_of_range)?;
    let new_balance = credit
        .balance
        .checked_add(entry.amount)
        .ok_or_else(amount_out_of_range)?;
    if entry.transaction_type == TransactionType::Withdrawal && new_balance < 0 {
        log::warn!(
            "Rejected withdrawal of {} for agent {}: balance {}",
            required,
            entry.agent_id,
            credit.balance
        );
        return Err(AppError::InsufficientCredit {
            balance: credit.balance,
            required,
        });
    }

    let now = Utc::now();
    let mut am = credit.into_active_model();
    am.balance = Set(new_balance);
    am.updated_at = Set(now);
    let credit = am.update(conn).await?;

    let tx = transactions::ActiveModel {
        credit_id: Set(credit.id),
        transaction_type: Set(entry.transaction_type),
        amount: Set(entry.amount),
        balance_after: Set(new_balance),
        description: Set(entry.description.clone()),
        payment_id: Set(entry.payment_id),
        subscription_id: Set(entry.subscription_id),
        created_by: Set(entry.created_by),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    log::info!(
        "Ledger {} for agent {}: amount {}, balance_after {}",
        entry.transaction_type,
        entry.agent_id,
        entry.amount,
        new_balance
    );

    Ok((credit, tx))
}
