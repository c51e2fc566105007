#![allow(dead_code)]

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use vesta_backend::entities::*;
use vesta_backend::models::*;
use vesta_backend::services::*;

/// Fresh in-memory SQLite database with every table created from the entities.
/// A single connection keeps the whole test on the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    create_schema(&db).await;
    db
}

/// File-backed SQLite database behind a pool of several connections, so
/// concurrent service calls really run on separate connections.
pub struct SharedDb {
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for SharedDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub async fn setup_shared_db() -> SharedDb {
    let path = std::env::temp_dir().join(format!("vesta-{}.db", uuid::Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(4).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    create_schema(&db).await;
    SharedDb { db, path }
}

async fn create_schema(db: &DatabaseConnection) {
    create_table(db, users::Entity).await;
    create_table(db, agents::Entity).await;
    create_table(db, agent_groups::Entity).await;
    create_table(db, agent_group_members::Entity).await;
    create_table(db, credits::Entity).await;
    create_table(db, product_groups::Entity).await;
    create_table(db, products::Entity).await;
    create_table(db, payments::Entity).await;
    create_table(db, transactions::Entity).await;
    create_table(db, subscriptions::Entity).await;
    create_table(db, notifications::Entity).await;
    create_table(db, activity_logs::Entity).await;
    create_table(db, settings::Entity).await;
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let stmt = backend.build(&schema.create_table_from_entity(entity));
    db.execute(stmt).await.unwrap();
}

/// Notifier double that records every notice instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn recorder() -> (Arc<RecordingNotifier>, Arc<dyn Notifier>) {
    let recorder = Arc::new(RecordingNotifier::default());
    let notifier: Arc<dyn Notifier> = recorder.clone();
    (recorder, notifier)
}

pub const ADMIN_PASSWORD: &str = "Admin12345";

pub async fn create_admin(db: &DatabaseConnection) -> UserResponse {
    UserService::new(db.clone())
        .create_user(CreateUserRequest {
            mobile: "09120000001".to_string(),
            username: Some("admin".to_string()),
            email: Some("admin@example.com".to_string()),
            password: Some(ADMIN_PASSWORD.to_string()),
            first_name: "Site".to_string(),
            last_name: "Admin".to_string(),
            role: UserRole::Admin,
            telegram_id: None,
            business_name: None,
        })
        .await
        .unwrap()
}

/// Creates an AGENT user; its agent and empty credit come with it.
pub async fn create_agent(db: &DatabaseConnection, mobile: &str) -> AgentResponse {
    let user = UserService::new(db.clone())
        .create_user(CreateUserRequest {
            mobile: mobile.to_string(),
            username: None,
            email: None,
            password: None,
            first_name: "Reza".to_string(),
            last_name: format!("Agent {mobile}"),
            role: UserRole::Agent,
            telegram_id: None,
            business_name: Some("Reza Net".to_string()),
        })
        .await
        .unwrap();
    AgentService::new(db.clone())
        .get_by_user(user.id)
        .await
        .unwrap()
}

pub async fn fund(db: &DatabaseConnection, agent_id: i64, amount: i64, admin_id: i64) -> i64 {
    CreditService::new(db.clone())
        .add_transaction(
            LedgerEntry::deposit(agent_id, amount)
                .created_by(admin_id)
                .description("opening balance"),
        )
        .await
        .unwrap()
        .balance
}

pub async fn balance(db: &DatabaseConnection, agent_id: i64) -> i64 {
    CreditService::new(db.clone())
        .get_credit(agent_id)
        .await
        .unwrap()
        .balance
}

pub async fn transaction_count(db: &DatabaseConnection, agent_id: i64) -> u64 {
    CreditService::new(db.clone())
        .list_transactions(agent_id, &PaginationParams::new(None, None))
        .await
        .unwrap()
        .pagination
        .total
}

pub fn product_request(group_id: i64, price: i64, duration_type: DurationType) -> CreateProductRequest {
    CreateProductRequest {
        name: "Monthly plan".to_string(),
        description: None,
        product_type: ProductType::UserPassword,
        group_id,
        price,
        commission_rate: 10.0,
        duration_type,
        duration_value: 1,
        is_active: true,
        has_test_option: false,
        test_duration: 0,
    }
}

pub async fn create_product(db: &DatabaseConnection, request: impl FnOnce(i64) -> CreateProductRequest) -> ProductResponse {
    let products = ProductService::new(db.clone());
    let group = products
        .create_group(ProductGroupRequest {
            name: "VPN".to_string(),
            description: None,
        })
        .await
        .unwrap();
    products.create_product(request(group.id)).await.unwrap()
}

pub fn subscription_request(product_id: i64, agent_id: i64) -> CreateSubscriptionRequest {
    CreateSubscriptionRequest {
        product_id,
        agent_id: Some(agent_id),
        customer_name: "Customer One".to_string(),
        customer_note: None,
        price: None,
        is_test: false,
    }
}

pub fn card_payment(amount: i64) -> NewPayment {
    NewPayment {
        amount,
        method: PaymentMethod::CardToCard,
        description: Some("card to card".to_string()),
        receipt_image: None,
    }
}
