mod support;

use support::*;
use vesta_backend::AppError;
use vesta_backend::entities::TransactionType;
use vesta_backend::models::{LedgerEntry, MAX_ENTRY_AMOUNT, PaginationParams};
use vesta_backend::services::CreditService;

#[tokio::test]
async fn test_new_agent_starts_with_empty_credit() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;

    assert_eq!(agent.balance, 0);
    assert_eq!(balance(&db, agent.id).await, 0);
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_balance_matches_transaction_sum() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let credits = CreditService::new(db.clone());

    credits
        .add_transaction(LedgerEntry::deposit(agent.id, 70_000).created_by(admin.id))
        .await
        .unwrap();
    credits
        .add_transaction(LedgerEntry::withdrawal(agent.id, 20_000).created_by(admin.id))
        .await
        .unwrap();
    let credit = credits
        .add_transaction(LedgerEntry::deposit(agent.id, 5_000).created_by(admin.id))
        .await
        .unwrap();
    assert_eq!(credit.balance, 55_000);

    let audit = credits.audit_balance(agent.id).await.unwrap();
    assert!(audit.consistent);
    assert_eq!(audit.balance, 55_000);
    assert_eq!(audit.transactions_sum, 55_000);

    let page = credits
        .list_transactions(agent.id, &PaginationParams::new(None, None))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);
    // newest first
    assert_eq!(page.items[0].amount, 5_000);
    assert_eq!(page.items[0].balance_after, 55_000);
    assert_eq!(page.items[1].transaction_type, TransactionType::Withdrawal);
    assert_eq!(page.items[1].amount, -20_000);
    assert_eq!(page.items[1].balance_after, 50_000);
    assert_eq!(page.items[2].created_by, Some(admin.id));
}

#[tokio::test]
async fn test_withdrawal_never_overdraws() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    fund(&db, agent.id, 10_000, admin.id).await;

    let err = CreditService::new(db.clone())
        .add_transaction(LedgerEntry::withdrawal(agent.id, 10_001))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientCredit {
            balance: 10_000,
            required: 10_001
        }
    ));

    assert_eq!(balance(&db, agent.id).await, 10_000);
    assert_eq!(transaction_count(&db, agent.id).await, 1);
}

#[tokio::test]
async fn test_withdrawal_down_to_zero_is_allowed() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    fund(&db, agent.id, 10_000, admin.id).await;

    let credit = CreditService::new(db.clone())
        .add_transaction(LedgerEntry::withdrawal(agent.id, 10_000))
        .await
        .unwrap();
    assert_eq!(credit.balance, 0);
}

#[tokio::test]
async fn test_sign_mismatch_is_rejected_without_effect() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;

    let err = CreditService::new(db.clone())
        .add_transaction(LedgerEntry::deposit(agent.id, -500))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_unknown_agent_has_no_credit() {
    let db = setup_db().await;
    let credits = CreditService::new(db.clone());

    assert!(matches!(
        credits.get_credit(404).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        credits.audit_balance(404).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_credits_orders_by_agent() {
    let db = setup_db().await;
    let first = create_agent(&db, "09121111111").await;
    let second = create_agent(&db, "09122222222").await;

    let page = CreditService::new(db.clone())
        .list_credits(&PaginationParams::new(Some(1), Some(10)))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.items[0].agent_id, first.id);
    assert_eq!(page.items[1].agent_id, second.id);
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected_without_effect() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    let credits = CreditService::new(db.clone());

    for entry in [
        LedgerEntry::deposit(agent.id, i64::MAX),
        LedgerEntry::deposit(agent.id, MAX_ENTRY_AMOUNT + 1),
        LedgerEntry::withdrawal(agent.id, i64::MAX),
        LedgerEntry::withdrawal(agent.id, i64::MIN),
    ] {
        assert!(matches!(
            credits.add_transaction(entry).await,
            Err(AppError::ValidationError(_))
        ));
    }
    assert_eq!(balance(&db, agent.id).await, 0);
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}

#[tokio::test]
async fn test_deposit_that_would_overflow_balance_is_rejected() {
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use vesta_backend::entities::credits;

    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    credits::Entity::update_many()
        .col_expr(credits::Column::Balance, Expr::value(i64::MAX - 10))
        .filter(credits::Column::AgentId.eq(agent.id))
        .exec(&db)
        .await
        .unwrap();

    let err = CreditService::new(db.clone())
        .add_transaction(LedgerEntry::deposit(agent.id, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(balance(&db, agent.id).await, i64::MAX - 10);
    assert_eq!(transaction_count(&db, agent.id).await, 0);
}
