use crate::entities::{
    DurationType, NotificationType, SubscriptionStatus, agent_entity as agents, enum_expr,
    product_entity as products, subscription_entity as subscriptions,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AgentScope, CreateSubscriptionRequest, LedgerEntry, MAX_ENTRY_AMOUNT, Notice,
    PaginatedResponse, PaginationParams, SubscriptionResponse, UpdateSubscriptionRequest,
};
use crate::services::activity_log::{Activity, record_activity};
use crate::services::credit_service::apply_entry;
use crate::services::notification_service::Notifier;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;

/// End date of a subscription activated at `start`.
///
/// Months are a flat 30 days and years 365 days. Test subscriptions always
/// run for `test_duration` days, whatever the product's duration type.
/// Durations past chrono's representable range fail with `ValidationError`.
pub fn compute_end_date(
    start: DateTime<Utc>,
    duration_type: DurationType,
    duration_value: i32,
    is_test: bool,
    test_duration: i32,
) -> AppResult<Option<DateTime<Utc>>> {
    let days = if is_test {
        i64::from(test_duration)
    } else {
        let value = i64::from(duration_value);
        match duration_type {
            DurationType::Permanent => return Ok(None),
            DurationType::Days => value,
            DurationType::Months => value * 30,
            DurationType::Years => value * 365,
        }
    };
    Duration::try_days(days)
        .and_then(|d| start.checked_add_signed(d))
        .map(Some)
        .ok_or_else(|| {
            AppError::ValidationError(format!("Subscription duration of {days} days is too long"))
        })
}

/// Price charged for a new subscription.
fn effective_price(requested: Option<i64>, is_test: bool, product_price: i64) -> AppResult<i64> {
    match requested {
        Some(p) if p < 0 => Err(AppError::ValidationError(
            "Price must not be negative".to_string(),
        )),
        Some(p) if p > MAX_ENTRY_AMOUNT => Err(AppError::ValidationError(format!(
            "Price must not exceed {MAX_ENTRY_AMOUNT}"
        ))),
        Some(p) => Ok(p),
        None if is_test => Ok(0),
        None => Ok(product_price),
    }
}

/// Subscription lifecycle: `PENDING -> ACTIVE -> SUSPENDED`, plus
/// `ACTIVE -> EXPIRED` through [`SubscriptionService::expire_due`].
#[derive(Clone)]
pub struct SubscriptionService {
    pool: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl SubscriptionService {
    pub fn new(pool: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    pub async fn create(
        &self,
        scope: AgentScope,
        request: CreateSubscriptionRequest,
        actor_id: i64,
    ) -> AppResult<SubscriptionResponse> {
        let agent_id = match (scope, request.agent_id) {
            (AgentScope::Agent(own), Some(requested)) if requested != own => {
                return Err(AppError::Forbidden);
            }
            (AgentScope::Agent(own), _) => own,
            (AgentScope::All, Some(requested)) => requested,
            (AgentScope::All, None) => {
                return Err(AppError::ValidationError("agent_id is required".to_string()));
            }
        };

        let customer_name = request.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(AppError::ValidationError(
                "Customer name is required".to_string(),
            ));
        }

        let product = products::Entity::find_by_id(request.product_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", request.product_id)))?;
        let agent = agents::Entity::find_by_id(agent_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;

        if !product.is_active {
            return Err(AppError::InvalidState(format!(
                "Product {} is not active",
                product.id
            )));
        }
        if request.is_test && !product.has_test_option {
            return Err(AppError::InvalidState(format!(
                "Product {} has no test option",
                product.id
            )));
        }

        let price = effective_price(request.price, request.is_test, product.price)?;

        let txn = self.pool.begin().await?;
        let now = Utc::now();
        let created = subscriptions::ActiveModel {
            product_id: Set(product.id),
            agent_id: Set(agent.id),
            customer_id: Set(agent.user_id),
            customer_name: Set(customer_name),
            customer_note: Set(request.customer_note),
            status: Set(SubscriptionStatus::Pending),
            price: Set(price),
            is_test: Set(request.is_test),
            duration_type: Set(product.duration_type),
            duration_value: Set(product.duration_value),
            test_duration: Set(product.test_duration),
            start_date: Set(None),
            end_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        record_activity(
            &txn,
            Activity::new(actor_id, "create_subscription", "subscription", created.id).details(
                json!({
                    "product_id": created.product_id,
                    "agent_id": created.agent_id,
                    "price": created.price,
                    "is_test": created.is_test,
                }),
            ),
        )
        .await?;
        txn.commit().await?;

        Ok(SubscriptionResponse::from_model(created, now))
    }

    pub async fn get(&self, scope: AgentScope, id: i64) -> AppResult<SubscriptionResponse> {
        Ok(find_in_scope(&self.pool, scope, id).await?.into())
    }

    pub async fn list(
        &self,
        scope: AgentScope,
        status: Option<SubscriptionStatus>,
        product_id: Option<i64>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<SubscriptionResponse>> {
        let mut query = subscriptions::Entity::find();
        if let Some(agent_id) = scope.agent_id() {
            query = query.filter(subscriptions::Column::AgentId.eq(agent_id));
        }
        if let Some(status) = status {
            query = query.filter(subscriptions::Column::Status.eq(status));
        }
        if let Some(product_id) = product_id {
            query = query.filter(subscriptions::Column::ProductId.eq(product_id));
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(subscriptions::Column::CreatedAt)
            .order_by_desc(subscriptions::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        let now = Utc::now();
        Ok(PaginatedResponse::new(
            items
                .into_iter()
                .map(|m| SubscriptionResponse::from_model(m, now))
                .collect(),
            params,
            total,
        ))
    }

    /// Only customer details change, and only while the subscription is pending.
    pub async fn update(
        &self,
        scope: AgentScope,
        id: i64,
        request: UpdateSubscriptionRequest,
    ) -> AppResult<SubscriptionResponse> {
        let current = find_in_scope(&self.pool, scope, id).await?;
        if current.status != SubscriptionStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is {} and can no longer be edited",
                current.status
            )));
        }

        let mut update = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(subscriptions::Column::Id.eq(id))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Pending));

        if let Some(name) = request.customer_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::ValidationError(
                    "Customer name is required".to_string(),
                ));
            }
            update = update.col_expr(subscriptions::Column::CustomerName, Expr::value(name));
        }
        if let Some(note) = request.customer_note {
            update = update.col_expr(subscriptions::Column::CustomerNote, Expr::value(note));
        }

        if update.exec(&self.pool).await?.rows_affected == 0 {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is no longer pending"
            )));
        }

        Ok(find_by_id(&self.pool, id).await?.into())
    }

    /// Debits the agent (unless test or free), sets dates and marks the
    /// subscription ACTIVE, all in one transaction.
    pub async fn activate(
        &self,
        scope: AgentScope,
        id: i64,
        actor_id: i64,
    ) -> AppResult<SubscriptionResponse> {
        let txn = self.pool.begin().await?;

        let sub = find_in_scope(&txn, scope, id).await?;
        if sub.status != SubscriptionStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is {}, only pending subscriptions can be activated",
                sub.status
            )));
        }

        let start = Utc::now();
        let end = compute_end_date(
            start,
            sub.duration_type,
            sub.duration_value,
            sub.is_test,
            sub.test_duration,
        )?;

        let res = subscriptions::Entity::update_many()
            .col_expr(
                subscriptions::Column::Status,
                enum_expr(SubscriptionStatus::Active),
            )
            .col_expr(subscriptions::Column::StartDate, Expr::value(Some(start)))
            .col_expr(subscriptions::Column::EndDate, Expr::value(end))
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(start))
            .filter(subscriptions::Column::Id.eq(id))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Pending))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is no longer pending"
            )));
        }

        if !sub.is_test && sub.price > 0 {
            let entry = LedgerEntry::withdrawal(sub.agent_id, sub.price)
                .subscription(id)
                .created_by(actor_id)
                .description(format!("Subscription #{id} activated"));
            apply_entry(&txn, &entry).await?;
        }

        record_activity(
            &txn,
            Activity::new(actor_id, "activate_subscription", "subscription", id).details(json!({
                "price": sub.price,
                "is_test": sub.is_test,
                "end_date": end,
            })),
        )
        .await?;

        let activated = find_by_id(&txn, id).await?;
        txn.commit().await?;

        let until = end
            .map(|e| format!(" until {}", e.format("%Y-%m-%d")))
            .unwrap_or_default();
        self.notifier.notify(
            Notice::new(
                activated.customer_id,
                NotificationType::System,
                "Subscription activated",
                format!(
                    "Subscription #{id} for {} is active{until}.",
                    activated.customer_name
                ),
            )
            .related_to(id),
        );

        Ok(SubscriptionResponse::from_model(activated, start))
    }

    /// ACTIVE -> SUSPENDED. No refund.
    pub async fn suspend(&self, id: i64, actor_id: i64) -> AppResult<SubscriptionResponse> {
        let txn = self.pool.begin().await?;

        let sub = find_by_id(&txn, id).await?;
        if sub.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is {}, only active subscriptions can be suspended",
                sub.status
            )));
        }

        let res = subscriptions::Entity::update_many()
            .col_expr(
                subscriptions::Column::Status,
                enum_expr(SubscriptionStatus::Suspended),
            )
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(subscriptions::Column::Id.eq(id))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::InvalidState(format!(
                "Subscription {id} is no longer active"
            )));
        }

        record_activity(
            &txn,
            Activity::new(actor_id, "suspend_subscription", "subscription", id),
        )
        .await?;

        let suspended = find_by_id(&txn, id).await?;
        txn.commit().await?;

        self.notifier.notify(
            Notice::new(
                suspended.customer_id,
                NotificationType::System,
                "Subscription suspended",
                format!(
                    "Subscription #{id} for {} was suspended.",
                    suspended.customer_name
                ),
            )
            .related_to(id),
        );

        Ok(suspended.into())
    }

    /// Moves every ACTIVE subscription whose end date has passed to EXPIRED.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let res = subscriptions::Entity::update_many()
            .col_expr(
                subscriptions::Column::Status,
                enum_expr(SubscriptionStatus::Expired),
            )
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .filter(subscriptions::Column::EndDate.is_not_null())
            .filter(subscriptions::Column::EndDate.lte(now))
            .exec(&self.pool)
            .await?;

        if res.rows_affected > 0 {
            log::info!("Expired {} subscriptions", res.rows_affected);
        }
        Ok(res.rows_affected)
    }
}

async fn find_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<subscriptions::Model> {
    subscriptions::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscription {id} not found")))
}

/// Subscriptions outside the caller's scope are reported as missing.
async fn find_in_scope<C: ConnectionTrait>(
    conn: &C,
    scope: AgentScope,
    id: i64,
) -> AppResult<subscriptions::Model> {
    let sub = find_by_id(conn, id).await?;
    if !scope.permits(sub.agent_id) {
        return Err(AppError::NotFound(format!("Subscription {id} not found")));
    }
    Ok(sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_end_date_days() {
        let end = compute_end_date(start(), DurationType::Days, 10, false, 0).unwrap().unwrap();
        assert_eq!(end - start(), Duration::days(10));
    }

    #[test]
    fn test_end_date_months_are_thirty_days() {
        let end = compute_end_date(start(), DurationType::Months, 1, false, 0).unwrap().unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap());

        let end = compute_end_date(start(), DurationType::Months, 3, false, 0).unwrap().unwrap();
        assert_eq!(end - start(), Duration::days(90));
    }

    #[test]
    fn test_end_date_years() {
        let end = compute_end_date(start(), DurationType::Years, 2, false, 0).unwrap().unwrap();
        assert_eq!(end - start(), Duration::days(730));
    }

    #[test]
    fn test_permanent_has_no_end() {
        assert!(compute_end_date(start(), DurationType::Permanent, 1, false, 0).unwrap().is_none());
    }

    #[test]
    fn test_test_duration_overrides_product_duration() {
        for dt in [
            DurationType::Days,
            DurationType::Months,
            DurationType::Years,
            DurationType::Permanent,
        ] {
            let end = compute_end_date(start(), dt, 12, true, 3).unwrap().unwrap();
            assert_eq!(end - start(), Duration::days(3));
        }
    }

    #[test]
    fn test_unrepresentable_end_date_is_rejected() {
        assert!(matches!(
            compute_end_date(start(), DurationType::Years, 1_000_000, false, 0),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            compute_end_date(start(), DurationType::Days, 1, true, i32::MAX),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(effective_price(None, false, 100_000).unwrap(), 100_000);
        assert_eq!(effective_price(None, true, 100_000).unwrap(), 0);
        assert_eq!(effective_price(Some(5_000), true, 100_000).unwrap(), 5_000);
        assert_eq!(effective_price(Some(0), false, 100_000).unwrap(), 0);
        assert!(matches!(
            effective_price(Some(-1), false, 100_000),
            Err(AppError::ValidationError(_))
        ));
        assert!(effective_price(Some(i64::MAX), false, 100_000).is_err());
    }
}
