mod support;

use support::*;
use vesta_backend::AppError;
use vesta_backend::entities::UserRole;
use vesta_backend::models::{
    AgentGroupRequest, AgentScope, CreateUserRequest, CurrentUser, PaginationParams,
};
use vesta_backend::services::{AgentService, UserService};

fn group(name: &str) -> AgentGroupRequest {
    AgentGroupRequest {
        name: name.to_string(),
        description: None,
    }
}

fn plain_user(mobile: &str, role: UserRole) -> CreateUserRequest {
    CreateUserRequest {
        mobile: mobile.to_string(),
        username: None,
        email: None,
        password: None,
        first_name: "Sara".to_string(),
        last_name: "Karimi".to_string(),
        role,
        telegram_id: None,
        business_name: None,
    }
}

#[tokio::test]
async fn test_create_user_normalises_and_rejects_duplicates() {
    let db = setup_db().await;
    let users = UserService::new(db.clone());

    let user = users
        .create_user(plain_user("+98 912 333 4444", UserRole::Admin))
        .await
        .unwrap();
    assert_eq!(user.mobile, "09123334444");
    assert_eq!(user.username, "09123334444");
    assert!(user.is_active);

    assert!(matches!(
        users
            .create_user(plain_user("09123334444", UserRole::Agent))
            .await,
        Err(AppError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_promoting_user_creates_agent_and_credit() {
    let db = setup_db().await;
    let user = UserService::new(db.clone())
        .create_user(plain_user("09123334444", UserRole::Admin))
        .await
        .unwrap();
    let agents = AgentService::new(db.clone());
    let vip = agents.create_group(group("VIP")).await.unwrap();

    let agent = agents.create(user.id, vec![vip.id, vip.id]).await.unwrap();
    assert_eq!(agent.user.role, UserRole::Agent);
    assert_eq!(agent.balance, 0);
    assert_eq!(agent.groups.len(), 1);
    assert_eq!(balance(&db, agent.id).await, 0);

    assert!(matches!(
        agents.create(user.id, Vec::new()).await,
        Err(AppError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_create_agent_with_unknown_group_rolls_back() {
    let db = setup_db().await;
    let user = UserService::new(db.clone())
        .create_user(plain_user("09123334444", UserRole::Admin))
        .await
        .unwrap();
    let agents = AgentService::new(db.clone());

    assert!(matches!(
        agents.create(user.id, vec![99]).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        agents.get_by_user(user.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_group_membership() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    let agents = AgentService::new(db.clone());
    let gold = agents.create_group(group("Gold")).await.unwrap();
    let silver = agents.create_group(group("Silver")).await.unwrap();

    agents.add_member(gold.id, agent.id).await.unwrap();
    assert!(matches!(
        agents.add_member(gold.id, agent.id).await,
        Err(AppError::AlreadyExists(_))
    ));
    assert!(matches!(
        agents.add_member(gold.id, 999).await,
        Err(AppError::NotFound(_))
    ));

    agents.remove_member(gold.id, agent.id).await.unwrap();
    assert!(matches!(
        agents.remove_member(gold.id, agent.id).await,
        Err(AppError::NotFound(_))
    ));

    let updated = agents.update(agent.id, vec![silver.id, gold.id]).await.unwrap();
    let ids: Vec<i64> = updated.groups.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![gold.id, silver.id]);

    let names: Vec<String> = agents
        .list_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["Gold", "Silver"]);
}

#[tokio::test]
async fn test_group_name_is_required() {
    let db = setup_db().await;
    assert!(matches!(
        AgentService::new(db.clone()).create_group(group("  ")).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_list_agents_searches_user_fields() {
    let db = setup_db().await;
    let first = create_agent(&db, "09121111111").await;
    create_agent(&db, "09122222222").await;
    let agents = AgentService::new(db.clone());
    let params = PaginationParams::new(None, None);

    let all = agents.list(None, &params).await.unwrap();
    assert_eq!(all.pagination.total, 2);

    let found = agents.list(Some("1111111"), &params).await.unwrap();
    assert_eq!(found.pagination.total, 1);
    assert_eq!(found.items[0].id, first.id);
    assert_eq!(found.items[0].user.id, first.user.id);
}

#[tokio::test]
async fn test_deactivate_and_reactivate_agent() {
    let db = setup_db().await;
    let agent = create_agent(&db, "09121111111").await;
    let agents = AgentService::new(db.clone());

    assert!(!agents.deactivate(agent.id).await.unwrap().user.is_active);
    assert!(agents.activate(agent.id).await.unwrap().user.is_active);
}

#[tokio::test]
async fn test_resolve_scope() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let agent = create_agent(&db, "09121111111").await;
    let agents = AgentService::new(db.clone());

    let admin_scope = agents
        .resolve_scope(&CurrentUser {
            user_id: admin.id,
            role: UserRole::Admin,
        })
        .await
        .unwrap();
    assert_eq!(admin_scope, AgentScope::All);

    let agent_scope = agents
        .resolve_scope(&CurrentUser {
            user_id: agent.user.id,
            role: UserRole::Agent,
        })
        .await
        .unwrap();
    assert_eq!(agent_scope, AgentScope::Agent(agent.id));

    assert!(matches!(
        agents
            .resolve_scope(&CurrentUser {
                user_id: 999,
                role: UserRole::Agent,
            })
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_ensure_super_admin_is_idempotent() {
    let db = setup_db().await;
    let users = UserService::new(db.clone());

    assert!(users.ensure_super_admin("09120000000", "Admin12345").await.unwrap());
    assert!(!users.ensure_super_admin("09120000000", "Admin12345").await.unwrap());

    let page = users.list_users(Some("0912000"), &PaginationParams::new(None, None)).await.unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.items[0].role, UserRole::SuperAdmin);
}
