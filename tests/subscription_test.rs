mod support;

use chrono::{Duration, Utc};
use support::*;
use vesta_backend::AppError;
use vesta_backend::entities::{DurationType, SubscriptionStatus, TransactionType};
use vesta_backend::models::{
    AgentScope, CreateProductRequest, PaginationParams, UpdateSubscriptionRequest,
};
use vesta_backend::services::{CreditService, ProductService, SubscriptionService};

fn monthly(group_id: i64) -> CreateProductRequest {
    product_request(group_id, 100_000, DurationType::Months)
}

fn with_trial(group_id: i64) -> CreateProductRequest {
    CreateProductRequest {
        has_test_option: true,
        test_duration: 3,
        ..product_request(group_id, 100_000, DurationType::Years)
    }
}

#[tokio::test]
async fn test_activation_charges_and_sets_dates() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 150_000, admin.id).await;

    let (recorder, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(
            AgentScope::Agent(agent.id),
            subscription_request(product.id, agent.id),
            agent.user.id,
        )
        .await
        .unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Pending);
    assert_eq!(sub.price, 100_000);
    assert_eq!(sub.customer_id, agent.user.id);
    assert!(sub.start_date.is_none());

    let active = subs
        .activate(AgentScope::Agent(agent.id), sub.id, agent.user.id)
        .await
        .unwrap();
    assert_eq!(active.status, SubscriptionStatus::Active);
    let start = active.start_date.unwrap();
    assert_eq!(active.end_date.unwrap() - start, Duration::days(30));
    assert_eq!(active.days_left, Some(30));

    assert_eq!(balance(&db, agent.id).await, 50_000);
    let page = CreditService::new(db.clone())
        .list_transactions(agent.id, &PaginationParams::new(None, None))
        .await
        .unwrap();
    let charge = &page.items[0];
    assert_eq!(charge.transaction_type, TransactionType::Withdrawal);
    assert_eq!(charge.amount, -100_000);
    assert_eq!(charge.subscription_id, Some(sub.id));
    assert_eq!(charge.created_by, Some(agent.user.id));

    assert_eq!(recorder.notices().len(), 1);
    assert_eq!(recorder.notices()[0].related_id, Some(sub.id));
}

#[tokio::test]
async fn test_activation_is_atomic_on_insufficient_credit() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 50_000, admin.id).await;

    let (recorder, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();

    let err = subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientCredit {
            balance: 50_000,
            required: 100_000
        }
    ));

    let after = subs.get(AgentScope::All, sub.id).await.unwrap();
    assert_eq!(after.status, SubscriptionStatus::Pending);
    assert!(after.start_date.is_none());
    assert!(after.end_date.is_none());
    assert_eq!(balance(&db, agent.id).await, 50_000);
    assert_eq!(transaction_count(&db, agent.id).await, 1);
    assert!(recorder.notices().is_empty());
}

#[tokio::test]
async fn test_activate_twice_is_invalid_state() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 500_000, admin.id).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();
    subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();

    assert!(matches!(
        subs.activate(AgentScope::All, sub.id, admin.id).await,
        Err(AppError::InvalidState(_))
    ));
    assert_eq!(balance(&db, agent.id).await, 400_000);
}

#[tokio::test]
async fn test_trial_uses_test_duration_and_is_free() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, with_trial).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let mut request = subscription_request(product.id, agent.id);
    request.is_test = true;
    let sub = subs.create(AgentScope::All, request, admin.id).await.unwrap();
    assert_eq!(sub.price, 0);

    let active = subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();
    assert_eq!(
        active.end_date.unwrap() - active.start_date.unwrap(),
        Duration::days(3)
    );
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_zero_price_activation_writes_no_ledger_row() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let mut request = subscription_request(product.id, agent.id);
    request.price = Some(0);
    let sub = subs.create(AgentScope::All, request, admin.id).await.unwrap();

    let active = subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();
    assert_eq!(active.status, SubscriptionStatus::Active);
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_trial_requires_test_option() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let mut request = subscription_request(product.id, agent.id);
    request.is_test = true;
    assert!(matches!(
        subs.create(AgentScope::All, request, admin.id).await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_inactive_product_cannot_be_sold() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    ProductService::new(db.clone())
        .deactivate_product(product.id)
        .await
        .unwrap();

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    assert!(matches!(
        subs.create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
            .await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_agent_scope_is_enforced() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let first = create_agent(&db, "09121111111").await;
    let second = create_agent(&db, "09122222222").await;
    let product = create_product(&db, monthly).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);

    assert!(matches!(
        subs.create(
            AgentScope::Agent(first.id),
            subscription_request(product.id, second.id),
            first.user.id
        )
        .await,
        Err(AppError::Forbidden)
    ));

    let mut admin_request = subscription_request(product.id, second.id);
    admin_request.agent_id = None;
    assert!(matches!(
        subs.create(AgentScope::All, admin_request, admin.id).await,
        Err(AppError::ValidationError(_))
    ));

    let theirs = subs
        .create(AgentScope::All, subscription_request(product.id, second.id), admin.id)
        .await
        .unwrap();
    assert!(matches!(
        subs.get(AgentScope::Agent(first.id), theirs.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        subs.activate(AgentScope::Agent(first.id), theirs.id, first.user.id)
            .await,
        Err(AppError::NotFound(_))
    ));

    let params = PaginationParams::new(None, None);
    let mine = subs
        .list(AgentScope::Agent(first.id), None, None, &params)
        .await
        .unwrap();
    assert_eq!(mine.pagination.total, 0);
    let all = subs.list(AgentScope::All, None, Some(product.id), &params).await.unwrap();
    assert_eq!(all.pagination.total, 1);
}

#[tokio::test]
async fn test_update_only_while_pending() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 100_000, admin.id).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();

    let updated = subs
        .update(
            AgentScope::All,
            sub.id,
            UpdateSubscriptionRequest {
                customer_name: Some("Renamed".to_string()),
                customer_note: Some("vip".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.customer_name, "Renamed");
    assert_eq!(updated.customer_note.as_deref(), Some("vip"));

    subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();
    assert!(matches!(
        subs.update(AgentScope::All, sub.id, UpdateSubscriptionRequest::default())
            .await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_suspend_only_active_and_keeps_charge() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 100_000, admin.id).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();

    assert!(matches!(
        subs.suspend(sub.id, admin.id).await,
        Err(AppError::InvalidState(_))
    ));

    subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();
    let suspended = subs.suspend(sub.id, admin.id).await.unwrap();
    assert_eq!(suspended.status, SubscriptionStatus::Suspended);
    assert_eq!(suspended.days_left, None);
    assert_eq!(balance(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_expire_due_moves_only_elapsed_active() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let monthly_product = create_product(&db, monthly).await;
    let permanent = create_product(&db, |group_id| {
        product_request(group_id, 0, DurationType::Permanent)
    })
    .await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let mut free = subscription_request(monthly_product.id, agent.id);
    free.price = Some(0);
    let timed = subs.create(AgentScope::All, free, admin.id).await.unwrap();
    let forever = subs
        .create(AgentScope::All, subscription_request(permanent.id, agent.id), admin.id)
        .await
        .unwrap();
    let pending = subs
        .create(AgentScope::All, subscription_request(monthly_product.id, agent.id), admin.id)
        .await
        .unwrap();
    subs.activate(AgentScope::All, timed.id, admin.id).await.unwrap();
    let forever = subs.activate(AgentScope::All, forever.id, admin.id).await.unwrap();
    assert!(forever.end_date.is_none());

    assert_eq!(subs.expire_due(Utc::now()).await.unwrap(), 0);
    assert_eq!(
        subs.expire_due(Utc::now() + Duration::days(31)).await.unwrap(),
        1
    );

    let statuses = [
        subs.get(AgentScope::All, timed.id).await.unwrap().status,
        subs.get(AgentScope::All, forever.id).await.unwrap().status,
        subs.get(AgentScope::All, pending.id).await.unwrap().status,
    ];
    assert_eq!(
        statuses,
        [
            SubscriptionStatus::Expired,
            SubscriptionStatus::Active,
            SubscriptionStatus::Pending
        ]
    );
}

#[tokio::test]
async fn test_oversized_duration_is_rejected() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    fund(&db, agent.id, 100_000, admin.id).await;

    let group_id = create_product(&db, monthly).await.group_id;
    let too_long = CreateProductRequest {
        duration_value: 1_000_000,
        ..product_request(group_id, 0, DurationType::Years)
    };
    assert!(matches!(
        ProductService::new(db.clone()).create_product(too_long).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_unrepresentable_end_date_leaves_subscription_pending() {
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use vesta_backend::entities::subscriptions;

    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, monthly).await;
    fund(&db, agent.id, 100_000, admin.id).await;

    let (recorder, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();

    // a row snapshotted before duration limits existed
    subscriptions::Entity::update_many()
        .col_expr(subscriptions::Column::DurationValue, Expr::value(i32::MAX))
        .filter(subscriptions::Column::Id.eq(sub.id))
        .exec(&db)
        .await
        .unwrap();

    assert!(matches!(
        subs.activate(AgentScope::All, sub.id, admin.id).await,
        Err(AppError::ValidationError(_))
    ));
    let after = subs.get(AgentScope::All, sub.id).await.unwrap();
    assert_eq!(after.status, SubscriptionStatus::Pending);
    assert!(after.start_date.is_none());
    assert_eq!(balance(&db, agent.id).await, 100_000);
    assert!(recorder.notices().is_empty());
}
