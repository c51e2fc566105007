//! End-to-end flows through the credit, payment and subscription services.

mod support;

use chrono::Duration;
use support::*;
use vesta_backend::AppError;
use vesta_backend::entities::{DurationType, PaymentStatus, SubscriptionStatus, TransactionType};
use vesta_backend::models::{AgentScope, CreateProductRequest, PaginationParams};
use vesta_backend::services::{CreditService, PaymentService, SubscriptionService};

#[tokio::test]
async fn test_approved_payment_becomes_deposit() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let (_, notifier) = recorder();
    let payments = PaymentService::new(db.clone(), notifier);

    let payment = payments
        .create_payment(agent.user.id, card_payment(100_000))
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    payments.approve(payment.id, admin.id, None).await.unwrap();

    assert_eq!(balance(&db, agent.id).await, 100_000);
    let page = CreditService::new(db.clone())
        .list_transactions(agent.id, &PaginationParams::new(None, None))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].transaction_type, TransactionType::Deposit);
    assert_eq!(page.items[0].balance_after, 100_000);
}

#[tokio::test]
async fn test_monthly_subscription_spends_whole_balance() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, |g| product_request(g, 100_000, DurationType::Months)).await;
    fund(&db, agent.id, 100_000, admin.id).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(
            AgentScope::Agent(agent.id),
            subscription_request(product.id, agent.id),
            agent.user.id,
        )
        .await
        .unwrap();
    assert_eq!(sub.price, 100_000);
    assert_eq!(sub.status, SubscriptionStatus::Pending);

    let active = subs
        .activate(AgentScope::Agent(agent.id), sub.id, agent.user.id)
        .await
        .unwrap();
    assert_eq!(active.status, SubscriptionStatus::Active);
    assert_eq!(
        active.end_date.unwrap(),
        active.start_date.unwrap() + Duration::days(30)
    );
    assert_eq!(balance(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_short_balance_leaves_everything_untouched() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, |g| product_request(g, 100_000, DurationType::Months)).await;
    fund(&db, agent.id, 50_000, admin.id).await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let sub = subs
        .create(AgentScope::All, subscription_request(product.id, agent.id), admin.id)
        .await
        .unwrap();

    assert!(matches!(
        subs.activate(AgentScope::All, sub.id, admin.id).await,
        Err(AppError::InsufficientCredit { .. })
    ));
    assert_eq!(balance(&db, agent.id).await, 50_000);
    assert_eq!(
        subs.get(AgentScope::All, sub.id).await.unwrap().status,
        SubscriptionStatus::Pending
    );
}

#[tokio::test]
async fn test_trial_ignores_product_duration() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let product = create_product(&db, |g| CreateProductRequest {
        has_test_option: true,
        test_duration: 3,
        ..product_request(g, 100_000, DurationType::Months)
    })
    .await;

    let (_, notifier) = recorder();
    let subs = SubscriptionService::new(db.clone(), notifier);
    let mut request = subscription_request(product.id, agent.id);
    request.is_test = true;
    let sub = subs.create(AgentScope::All, request, admin.id).await.unwrap();
    let active = subs.activate(AgentScope::All, sub.id, admin.id).await.unwrap();

    assert_eq!(
        active.end_date.unwrap(),
        active.start_date.unwrap() + Duration::days(3)
    );
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_rejected_payment_has_no_ledger_effect() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let (recorder, notifier) = recorder();
    let payments = PaymentService::new(db.clone(), notifier);

    let payment = payments
        .create_payment(agent.user.id, card_payment(100_000))
        .await
        .unwrap();
    let rejected = payments
        .reject(payment.id, admin.id, Some("invalid receipt".to_string()))
        .await
        .unwrap();

    assert_eq!(rejected.status, PaymentStatus::Rejected);
    assert_eq!(rejected.approved_by, Some(admin.id));
    assert_eq!(rejected.admin_note.as_deref(), Some("invalid receipt"));
    assert_eq!(balance(&db, agent.id).await, 0);
    assert_eq!(transaction_count(&db, agent.id).await, 0);

    let notices = recorder.notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("invalid receipt"));
}
