use crate::entities::{UserRole, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::external::SmsService;
use crate::models::{AccessTokenResponse, AuthResponse, OtpRequestResponse};
use crate::services::activity_log::{Activity, record_activity};
use crate::services::agent_service::create_agent_record;
use crate::services::user_service::{NewUser, insert_user};
use crate::utils::{ExpiringStore, JwtService, generate_six_digit_code, normalize_mobile, verify_password};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    sms_service: SmsService,
    otp_store: Arc<dyn ExpiringStore>,
    otp_ttl: Duration,
}

fn otp_key(mobile: &str) -> String {
    format!("otp:{mobile}")
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt_service: JwtService,
        sms_service: SmsService,
        otp_store: Arc<dyn ExpiringStore>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            sms_service,
            otp_store,
            otp_ttl,
        }
    }

    /// Password login by email, mobile or username.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<AuthResponse> {
        let identifier = identifier.trim();
        let filter = if identifier.contains('@') {
            users::Column::Email.eq(identifier.to_lowercase())
        } else if let Ok(mobile) = normalize_mobile(identifier) {
            users::Column::Mobile.eq(mobile)
        } else {
            users::Column::Username.eq(identifier)
        };

        let user = users::Entity::find()
            .filter(filter)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::AuthError(
                "Password login is not enabled for this account".to_string(),
            ));
        };
        if !verify_password(password, hash)? {
            return Err(AppError::AuthError("Invalid credentials".to_string()));
        }

        self.sign_in(user, "login").await
    }

    /// Sends a one-time code, registering unknown mobiles as agents.
    pub async fn request_otp(&self, mobile: &str) -> AppResult<OtpRequestResponse> {
        let mobile = normalize_mobile(mobile)?;

        if self.find_by_mobile(&mobile).await?.is_none() {
            match self.register_agent(&mobile).await {
                Ok(()) => {}
                // a concurrent request registered the same mobile first
                Err(AppError::DatabaseError(e))
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    if self.find_by_mobile(&mobile).await?.is_none() {
                        return Err(AppError::AlreadyExists(
                            "This mobile is already taken as a username".to_string(),
                        ));
                    }
                    log::info!("Mobile {mobile} was registered by a concurrent request");
                }
                Err(e) => return Err(e),
            }
        }

        let code = generate_six_digit_code();
        self.otp_store.save(&otp_key(&mobile), &code, self.otp_ttl);

        if let Err(e) = self.sms_service.send_otp(&mobile, &code).await {
            log::error!("Failed to send OTP to {mobile}: {e}");
        }

        Ok(OtpRequestResponse {
            mobile,
            expires_in: self.otp_ttl.as_secs(),
        })
    }

    pub async fn verify_otp(&self, mobile: &str, code: &str) -> AppResult<AuthResponse> {
        let mobile = normalize_mobile(mobile)?;
        let key = otp_key(&mobile);

        match self.otp_store.get(&key) {
            Some(stored) if stored == code.trim() => self.otp_store.delete(&key),
            _ => {
                return Err(AppError::AuthError(
                    "Invalid or expired verification code".to_string(),
                ));
            }
        }

        let user = self
            .find_by_mobile(&mobile)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid or expired verification code".to_string()))?;

        self.sign_in(user, "otp_login").await
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AccessTokenResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id = claims.user_id()?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;
        if !user.is_active {
            return Err(AppError::Forbidden);
        }

        Ok(AccessTokenResponse {
            access_token: self.jwt_service.generate_access_token(user.id, user.role)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    async fn sign_in(&self, user: users::Model, action: &str) -> AppResult<AuthResponse> {
        if !user.is_active {
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        users::Entity::update_many()
            .col_expr(users::Column::LastLogin, Expr::value(Some(now)))
            .filter(users::Column::Id.eq(user.id))
            .exec(&txn)
            .await?;
        record_activity(
            &txn,
            Activity::new(user.id, action, "user", user.id).details(json!({ "role": user.role })),
        )
        .await?;
        txn.commit().await?;

        let access_token = self.jwt_service.generate_access_token(user.id, user.role)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, user.role)?;

        let mut user = user;
        user.last_login = Some(now);

        Ok(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    async fn find_by_mobile(&self, mobile: &str) -> AppResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Mobile.eq(mobile))
            .one(&self.pool)
            .await?)
    }

    async fn register_agent(&self, mobile: &str) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        let user = insert_user(
            &txn,
            NewUser {
                username: mobile.to_string(),
                mobile: mobile.to_string(),
                email: None,
                password_hash: None,
                first_name: String::new(),
                last_name: String::new(),
                role: UserRole::Agent,
                telegram_id: None,
                business_name: None,
            },
        )
        .await?;
        create_agent_record(&txn, user.id).await?;
        record_activity(&txn, Activity::new(user.id, "register", "user", user.id)).await?;
        txn.commit().await?;

        log::info!("Registered agent user {} via OTP", user.id);
        Ok(())
    }
}
