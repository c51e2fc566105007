use crate::entities::{UserRole, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, PaginatedResponse, PaginationParams, UserResponse};
use crate::services::agent_service::create_agent_record;
use crate::utils::{hash_password, normalize_mobile, validate_password};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Admin-side account creation. AGENT accounts get their agent and credit
    /// rows in the same transaction.
    pub async fn create_user(&self, request: CreateUserRequest) -> AppResult<UserResponse> {
        let mobile = normalize_mobile(&request.mobile)?;
        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| mobile.clone());
        let email = request
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        let password_hash = match request.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let txn = self.pool.begin().await?;
        ensure_unique(&txn, &mobile, &username, email.as_deref()).await?;

        let user = insert_user(
            &txn,
            NewUser {
                username,
                mobile,
                email,
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                role: request.role,
                telegram_id: request.telegram_id,
                business_name: request.business_name,
            },
        )
        .await?;

        if user.role == UserRole::Agent {
            create_agent_record(&txn, user.id).await?;
        }
        txn.commit().await?;

        log::info!("User {} created with role {}", user.id, user.role);
        Ok(user.into())
    }

    pub async fn get_user(&self, id: i64) -> AppResult<UserResponse> {
        users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<UserResponse>> {
        let mut query = users::Entity::find();
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Username.contains(term))
                    .add(users::Column::FirstName.contains(term))
                    .add(users::Column::LastName.contains(term))
                    .add(users::Column::Mobile.contains(term))
                    .add(users::Column::Email.contains(term)),
            );
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
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

    /// Creates the configured super admin unless the mobile is already taken.
    /// Returns whether a user was created.
    pub async fn ensure_super_admin(&self, mobile: &str, password: &str) -> AppResult<bool> {
        let mobile = normalize_mobile(mobile)?;
        let existing = users::Entity::find()
            .filter(users::Column::Mobile.eq(mobile.as_str()))
            .one(&self.pool)
            .await?;
        if let Some(user) = existing {
            if user.role != UserRole::SuperAdmin {
                log::warn!(
                    "Bootstrap mobile {mobile} belongs to user {} with role {}",
                    user.id,
                    user.role
                );
            }
            return Ok(false);
        }

        validate_password(password)?;
        let user = insert_user(
            &self.pool,
            NewUser {
                username: mobile.clone(),
                mobile,
                email: None,
                password_hash: Some(hash_password(password)?),
                first_name: "Super".to_string(),
                last_name: "Admin".to_string(),
                role: UserRole::SuperAdmin,
                telegram_id: None,
                business_name: None,
            },
        )
        .await?;

        log::info!("Bootstrapped super admin user {}", user.id);
        Ok(true)
    }
}

pub(crate) struct NewUser {
    pub username: String,
    pub mobile: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub telegram_id: Option<String>,
    pub business_name: Option<String>,
}

pub(crate) async fn insert_user<C: ConnectionTrait>(conn: &C, new: NewUser) -> AppResult<users::Model> {
    let now = Utc::now();
    let user = users::ActiveModel {
        username: Set(new.username),
        mobile: Set(new.mobile),
        email: Set(new.email),
        password_hash: Set(new.password_hash),
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        role: Set(new.role),
        is_active: Set(true),
        telegram_id: Set(new.telegram_id),
        business_name: Set(new.business_name),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(user)
}

async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    mobile: &str,
    username: &str,
    email: Option<&str>,
) -> AppResult<()> {
    let mut cond = Condition::any()
        .add(users::Column::Mobile.eq(mobile))
        .add(users::Column::Username.eq(username));
    if let Some(email) = email {
        cond = cond.add(users::Column::Email.eq(email));
    }

    if let Some(existing) = users::Entity::find().filter(cond).one(conn).await? {
        let field = if existing.mobile == mobile {
            "mobile"
        } else if existing.username == username {
            "username"
        } else {
            "email"
        };
        return Err(AppError::AlreadyExists(format!(
            "A user with this {field} already exists"
        )));
    }
    Ok(())
}
