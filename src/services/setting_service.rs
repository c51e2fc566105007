use crate::services::activity_log::{Activity, record_activity};
use crate::entities::setting_entity as settings;
use crate::error::{AppError, AppResult};
use crate::models::{CreateSettingRequest, SettingResponse, UpdateSettingRequest};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde_json::json;
use std::collections::BTreeMap;

/// Seeded on startup when missing; existing values are never overwritten.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str, &str)] = &[
    ("site_name", "VestaResellerPanel", "Name shown in the panel", "general"),
    (
        "card_to_card_info",
        "Card number: 0000-0000-0000-0000\nBank: -\nHolder: -",
        "Card-to-card deposit details shown to agents",
        "payment",
    ),
    (
        "default_commission_rate",
        "10",
        "Commission rate suggested for new products (percent)",
        "business",
    ),
    (
        "telegram_notifications",
        "true",
        "Whether notices are pushed to Telegram",
        "notification",
    ),
];

#[derive(Clone)]
pub struct SettingService {
    pool: DatabaseConnection,
}

impl SettingService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<SettingResponse>> {
        let rows = settings::Entity::find()
            .order_by_asc(settings::Column::Category)
            .order_by_asc(settings::Column::Key)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, key: &str) -> AppResult<SettingResponse> {
        Ok(find_setting(&self.pool, key).await?.into())
    }

    pub async fn by_category(&self, category: &str) -> AppResult<BTreeMap<String, String>> {
        let rows = settings::Entity::find()
            .filter(settings::Column::Category.eq(category))
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
    }

    pub async fn create(
        &self,
        request: CreateSettingRequest,
        actor_id: i64,
    ) -> AppResult<SettingResponse> {
        let key = required_key(&request.key)?;
        let category = required_category(&request.category)?;

        let txn = self.pool.begin().await?;
        if find_by_key(&txn, &key).await?.is_some() {
            return Err(duplicate_key(&key));
        }

        let now = Utc::now();
        let setting = settings::ActiveModel {
            key: Set(key.clone()),
            value: Set(request.value),
            description: Set(request.description),
            category: Set(category),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_key(&key),
            _ => e.into(),
        })?;

        record_activity(
            &txn,
            Activity::new(actor_id, "setting_created", "setting", setting.id)
                .details(json!({ "key": setting.key })),
        )
        .await?;
        txn.commit().await?;

        log::info!("Setting {key} created by {actor_id}");
        Ok(setting.into())
    }

    pub async fn update(
        &self,
        key: &str,
        request: UpdateSettingRequest,
        actor_id: i64,
    ) -> AppResult<SettingResponse> {
        let category = request
            .category
            .as_deref()
            .map(required_category)
            .transpose()?;

        let txn = self.pool.begin().await?;
        let current = find_setting(&txn, key).await?;
        let mut am = current.into_active_model();
        am.value = Set(request.value);
        if request.description.is_some() {
            am.description = Set(request.description);
        }
        if let Some(category) = category {
            am.category = Set(category);
        }
        am.updated_at = Set(Utc::now());
        let setting = am.update(&txn).await?;

        record_activity(
            &txn,
            Activity::new(actor_id, "setting_updated", "setting", setting.id)
                .details(json!({ "key": setting.key })),
        )
        .await?;
        txn.commit().await?;
        Ok(setting.into())
    }

    /// Sets the value of every listed key that exists, in one transaction.
    /// Returns how many settings were changed.
    pub async fn bulk_update(
        &self,
        values: BTreeMap<String, String>,
        actor_id: i64,
    ) -> AppResult<u64> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();
        let mut updated = Vec::new();

        for (key, value) in values {
            let res = settings::Entity::update_many()
                .col_expr(settings::Column::Value, Expr::value(value))
                .col_expr(settings::Column::UpdatedAt, Expr::value(now))
                .filter(settings::Column::Key.eq(key.as_str()))
                .exec(&txn)
                .await?;
            if res.rows_affected > 0 {
                updated.push(key);
            } else {
                log::debug!("Bulk update skipped unknown setting {key}");
            }
        }

        if !updated.is_empty() {
            record_activity(
                &txn,
                Activity {
                    user_id: Some(actor_id),
                    action: "settings_bulk_updated",
                    entity_type: "setting",
                    entity_id: None,
                    details: Some(json!({ "keys": updated })),
                },
            )
            .await?;
        }
        txn.commit().await?;
        Ok(updated.len() as u64)
    }

    /// Inserts each default that is missing. Returns how many were added.
    pub async fn ensure_defaults(&self) -> AppResult<u64> {
        let mut added = 0;
        for (key, value, description, category) in DEFAULT_SETTINGS {
            if find_by_key(&self.pool, key).await?.is_some() {
                continue;
            }
            let now = Utc::now();
            let res = settings::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                description: Set(Some(description.to_string())),
                category: Set(category.to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.pool)
            .await;
            match res {
                Ok(_) => added += 1,
                // another instance seeded it first
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if added > 0 {
            log::info!("Seeded {added} default settings");
        }
        Ok(added)
    }
}

fn duplicate_key(key: &str) -> AppError {
    AppError::AlreadyExists(format!("Setting {key} already exists"))
}

fn required_key(key: &str) -> AppResult<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::ValidationError("Setting key is required".to_string()));
    }
    if key.len() > 100 || key.contains('/') {
        return Err(AppError::ValidationError(
            "Setting key must be at most 100 characters and contain no '/'".to_string(),
        ));
    }
    Ok(key.to_string())
}

fn required_category(category: &str) -> AppResult<String> {
    let category = category.trim();
    if category.is_empty() || category.len() > 50 {
        return Err(AppError::ValidationError(
            "Setting category must be 1 to 50 characters".to_string(),
        ));
    }
    Ok(category.to_string())
}

async fn find_by_key<C: ConnectionTrait>(conn: &C, key: &str) -> AppResult<Option<settings::Model>> {
    Ok(settings::Entity::find()
        .filter(settings::Column::Key.eq(key))
        .one(conn)
        .await?)
}

async fn find_setting<C: ConnectionTrait>(conn: &C, key: &str) -> AppResult<settings::Model> {
    find_by_key(conn, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Setting {key} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_key() {
        assert_eq!(required_key("  site_name ").unwrap(), "site_name");
        assert!(required_key("   ").is_err());
        assert!(required_key("a/b").is_err());
        assert!(required_key(&"k".repeat(101)).is_err());
    }

    #[test]
    fn test_required_category() {
        assert_eq!(required_category("payment").unwrap(), "payment");
        assert!(required_category("").is_err());
        assert!(required_category(&"c".repeat(51)).is_err());
    }

    #[test]
    fn test_defaults_have_unique_keys() {
        let mut keys: Vec<_> = DEFAULT_SETTINGS.iter().map(|d| d.0).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), DEFAULT_SETTINGS.len());
        assert!(DEFAULT_SETTINGS.iter().any(|d| d.0 == "card_to_card_info" && d.3 == "payment"));
    }
}
