use crate::entities::{
    NotificationType, enum_expr, PaymentMethod, PaymentStatus, agent_entity as agents,
    payment_entity as payments,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AgentScope, LedgerEntry, MAX_ENTRY_AMOUNT, NewPayment, Notice, PaginatedResponse,
    PaginationParams, PaymentResponse,
};
use crate::services::activity_log::{Activity, record_activity};
use crate::services::credit_service::apply_entry;
use crate::services::notification_service::Notifier;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;

/// Manually reviewed top-ups.
///
/// `PENDING -> COMPLETED` credits the owning agent exactly once;
/// `PENDING -> REJECTED` has no ledger effect. Both are terminal.
#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    pub async fn create_payment(
        &self,
        user_id: i64,
        payment: NewPayment,
    ) -> AppResult<PaymentResponse> {
        if payment.amount <= 0 {
            return Err(AppError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        if payment.amount > MAX_ENTRY_AMOUNT {
            return Err(AppError::ValidationError(format!(
                "Payment amount must not exceed {MAX_ENTRY_AMOUNT}"
            )));
        }
        if payment.method != PaymentMethod::CardToCard {
            return Err(AppError::ValidationError(format!(
                "Payment method {} is not accepted",
                payment.method
            )));
        }

        let txn = self.pool.begin().await?;
        let now = Utc::now();
        let created = payments::ActiveModel {
            user_id: Set(user_id),
            method: Set(payment.method),
            amount: Set(payment.amount),
            status: Set(PaymentStatus::Pending),
            description: Set(payment.description),
            receipt_image: Set(payment.receipt_image),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        record_activity(
            &txn,
            Activity::new(user_id, "create_payment", "payment", created.id)
                .details(json!({ "amount": created.amount })),
        )
        .await?;
        txn.commit().await?;

        log::info!(
            "Payment {} of {} submitted by user {}",
            created.id,
            created.amount,
            user_id
        );
        Ok(created.into())
    }

    pub async fn get_payment(&self, scope: AgentScope, id: i64) -> AppResult<PaymentResponse> {
        let query = self
            .scoped(payments::Entity::find_by_id(id), scope)
            .await?;
        query
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Payment {id} not found")))
    }

    pub async fn list_payments(
        &self,
        scope: AgentScope,
        status: Option<PaymentStatus>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<PaymentResponse>> {
        let mut query = self.scoped(payments::Entity::find(), scope).await?;
        if let Some(status) = status {
            query = query.filter(payments::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
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

    /// Completes a pending payment and deposits its amount in one transaction.
    pub async fn approve(
        &self,
        payment_id: i64,
        admin_id: i64,
        admin_note: Option<String>,
    ) -> AppResult<PaymentResponse> {
        let txn = self.pool.begin().await?;

        let payment = find_pending(&txn, payment_id).await?;
        let agent = agents::Entity::find()
            .filter(agents::Column::UserId.eq(payment.user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "User {} of payment {payment_id} has no agent record",
                    payment.user_id
                ))
            })?;

        transition(
            &txn,
            payment_id,
            PaymentStatus::Completed,
            admin_id,
            admin_note,
        )
        .await?;

        let entry = LedgerEntry::deposit(agent.id, payment.amount)
            .payment(payment_id)
            .created_by(admin_id)
            .description(format!("Payment #{payment_id} approved"));
        let (credit, _) = apply_entry(&txn, &entry).await?;

        record_activity(
            &txn,
            Activity::new(admin_id, "approve_payment", "payment", payment_id).details(json!({
                "amount": payment.amount,
                "agent_id": agent.id,
                "balance_after": credit.balance,
            })),
        )
        .await?;

        let updated = reload(&txn, payment_id).await?;
        txn.commit().await?;

        self.notifier.notify(
            Notice::new(
                updated.user_id,
                NotificationType::Payment,
                "Payment approved",
                format!(
                    "Your payment of {} was approved. New balance: {}",
                    updated.amount, credit.balance
                ),
            )
            .related_to(payment_id),
        );

        Ok(updated.into())
    }

    pub async fn reject(
        &self,
        payment_id: i64,
        admin_id: i64,
        admin_note: Option<String>,
    ) -> AppResult<PaymentResponse> {
        let txn = self.pool.begin().await?;

        find_pending(&txn, payment_id).await?;
        transition(
            &txn,
            payment_id,
            PaymentStatus::Rejected,
            admin_id,
            admin_note.clone(),
        )
        .await?;

        record_activity(
            &txn,
            Activity::new(admin_id, "reject_payment", "payment", payment_id)
                .details(json!({ "admin_note": admin_note })),
        )
        .await?;

        let updated = reload(&txn, payment_id).await?;
        txn.commit().await?;

        let reason = updated
            .admin_note
            .clone()
            .map(|n| format!(" Reason: {n}"))
            .unwrap_or_default();
        self.notifier.notify(
            Notice::new(
                updated.user_id,
                NotificationType::Payment,
                "Payment rejected",
                format!("Your payment of {} was rejected.{reason}", updated.amount),
            )
            .related_to(payment_id),
        );

        Ok(updated.into())
    }

    /// Restricts a payment query to the payer's own rows for agent scopes.
    async fn scoped(
        &self,
        query: Select<payments::Entity>,
        scope: AgentScope,
    ) -> AppResult<Select<payments::Entity>> {
        let Some(agent_id) = scope.agent_id() else {
            return Ok(query);
        };
        let agent = agents::Entity::find_by_id(agent_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;
        Ok(query.filter(payments::Column::UserId.eq(agent.user_id)))
    }
}

async fn find_pending<C: ConnectionTrait>(conn: &C, payment_id: i64) -> AppResult<payments::Model> {
    let payment = payments::Entity::find_by_id(payment_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))?;
    if payment.status != PaymentStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "Payment {payment_id} is already {}",
            payment.status
        )));
    }
    Ok(payment)
}

/// Moves a payment out of PENDING. The status guard in the WHERE clause lets
/// only one of two racing reviewers succeed.
async fn transition<C: ConnectionTrait>(
    conn: &C,
    payment_id: i64,
    to: PaymentStatus,
    admin_id: i64,
    admin_note: Option<String>,
) -> AppResult<()> {
    let now = Utc::now();
    let res = payments::Entity::update_many()
        .col_expr(payments::Column::Status, enum_expr(to))
        .col_expr(payments::Column::ApprovedBy, Expr::value(admin_id))
        .col_expr(payments::Column::ApprovedAt, Expr::value(now))
        .col_expr(payments::Column::AdminNote, Expr::value(admin_note))
        .col_expr(payments::Column::UpdatedAt, Expr::value(now))
        .filter(payments::Column::Id.eq(payment_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Pending))
        .exec(conn)
        .await?;

    if res.rows_affected == 0 {
        return Err(AppError::InvalidState(format!(
            "Payment {payment_id} is no longer pending"
        )));
    }
    Ok(())
}

async fn reload<C: ConnectionTrait>(conn: &C, payment_id: i64) -> AppResult<payments::Model> {
    payments::Entity::find_by_id(payment_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))
}
