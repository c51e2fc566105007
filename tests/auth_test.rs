mod support;

use std::sync::Arc;
use std::time::Duration;
use support::*;
use vesta_backend::AppError;
use vesta_backend::config::SmsConfig;
use vesta_backend::entities::UserRole;
use vesta_backend::external::SmsService;
use vesta_backend::models::{CreateUserRequest, PaginationParams};
use vesta_backend::services::{AgentService, AuthService, UserService};
use vesta_backend::utils::{ExpiringStore, JwtService, MemoryStore};

fn jwt() -> JwtService {
    JwtService::new("test-secret", 3600, 86400)
}

fn auth_service(db: &sea_orm::DatabaseConnection, store: Arc<MemoryStore>) -> AuthService {
    AuthService::new(
        db.clone(),
        jwt(),
        SmsService::new(SmsConfig::default()),
        store,
        Duration::from_secs(120),
    )
}

#[tokio::test]
async fn test_password_login_by_any_identifier() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));

    for identifier in ["admin@example.com", "ADMIN@example.com", "09120000001", "admin"] {
        let response = auth.login(identifier, ADMIN_PASSWORD).await.unwrap();
        assert_eq!(response.user.id, admin.id);
        assert_eq!(response.token_type, "Bearer");
        assert!(response.user.last_login.is_some());

        let claims = jwt().verify_access_token(&response.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), admin.id);
        assert_eq!(claims.role, UserRole::Admin);
    }
}

#[tokio::test]
async fn test_login_failures() {
    let db = setup_db().await;
    create_admin(&db).await;
    create_agent(&db, "09121111111").await;
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));

    assert!(matches!(
        auth.login("admin", "wrong-password1").await,
        Err(AppError::AuthError(_))
    ));
    assert!(matches!(
        auth.login("nobody", ADMIN_PASSWORD).await,
        Err(AppError::AuthError(_))
    ));
    // OTP-only account
    assert!(matches!(
        auth.login("09121111111", ADMIN_PASSWORD).await,
        Err(AppError::AuthError(_))
    ));
}

#[tokio::test]
async fn test_otp_registers_unknown_mobile_as_agent() {
    let db = setup_db().await;
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(&db, store.clone());

    let sent = auth.request_otp("+989125556666").await.unwrap();
    assert_eq!(sent.mobile, "09125556666");
    assert_eq!(sent.expires_in, 120);

    let code = store.get("otp:09125556666").unwrap();
    assert_eq!(code.len(), 6);

    let response = auth.verify_otp("09125556666", &code).await.unwrap();
    assert_eq!(response.user.mobile, "09125556666");
    assert_eq!(response.user.role, UserRole::Agent);

    let agent = AgentService::new(db.clone())
        .get_by_user(response.user.id)
        .await
        .unwrap();
    assert_eq!(agent.balance, 0);

    // single use
    assert!(matches!(
        auth.verify_otp("09125556666", &code).await,
        Err(AppError::AuthError(_))
    ));
}

#[tokio::test]
async fn test_otp_for_existing_user_does_not_register_again() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(&db, store.clone());

    auth.request_otp("09121111111").await.unwrap();
    auth.request_otp("09121111111").await.unwrap();
    let code = store.get("otp:09121111111").unwrap();

    let response = auth.verify_otp("09121111111", &code).await.unwrap();
    assert_eq!(response.user.id, agent.user.id);
}

#[tokio::test]
async fn test_wrong_otp_keeps_code_valid() {
    let db = setup_db().await;
    create_agent(&db, "09121111111").await;
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(&db, store.clone());

    auth.request_otp("09121111111").await.unwrap();
    let code = store.get("otp:09121111111").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    assert!(matches!(
        auth.verify_otp("09121111111", wrong).await,
        Err(AppError::AuthError(_))
    ));
    assert!(auth.verify_otp("09121111111", &code).await.is_ok());
}

#[tokio::test]
async fn test_inactive_user_is_forbidden() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    AgentService::new(db.clone())
        .deactivate(agent.id)
        .await
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(&db, store.clone());

    auth.request_otp("09121111111").await.unwrap();
    let code = store.get("otp:09121111111").unwrap();
    assert!(matches!(
        auth.verify_otp("09121111111", &code).await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn test_invalid_mobile_is_validation_error() {
    let db = setup_db().await;
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));
    assert!(matches!(
        auth.request_otp("12345").await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_refresh_issues_access_token_only_for_refresh_tokens() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));
    let session = auth.login("admin", ADMIN_PASSWORD).await.unwrap();

    let refreshed = auth.refresh(&session.refresh_token).await.unwrap();
    let claims = jwt().verify_access_token(&refreshed.access_token).unwrap();
    assert_eq!(claims.user_id().unwrap(), admin.id);

    assert!(auth.refresh(&session.access_token).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simultaneous_first_otp_requests_register_once() {
    let db = setup_db().await;
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));

    let (first, second) = tokio::join!(
        auth.request_otp("09125556666"),
        auth.request_otp("+989125556666"),
    );
    assert_eq!(first.unwrap().mobile, "09125556666");
    assert_eq!(second.unwrap().mobile, "09125556666");

    let users = UserService::new(db.clone())
        .list_users(Some("09125556666"), &PaginationParams::new(None, None))
        .await
        .unwrap();
    assert_eq!(users.pagination.total, 1);
    assert!(
        AgentService::new(db.clone())
            .get_by_user(users.items[0].id)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_otp_for_mobile_taken_as_username_is_a_conflict() {
    let db = setup_db().await;
    UserService::new(db.clone())
        .create_user(CreateUserRequest {
            mobile: "09127770000".to_string(),
            username: Some("09125556666".to_string()),
            email: None,
            password: None,
            first_name: "Taken".to_string(),
            last_name: "Name".to_string(),
            role: UserRole::Admin,
            telegram_id: None,
            business_name: None,
        })
        .await
        .unwrap();
    let auth = auth_service(&db, Arc::new(MemoryStore::new()));

    assert!(matches!(
        auth.request_otp("09125556666").await,
        Err(AppError::AlreadyExists(_))
    ));
}
