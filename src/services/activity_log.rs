use crate::entities::activity_log_entity as activity_logs;
use crate::error::AppResult;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;

/// One audit row. Written on the caller's connection so that it commits or
/// rolls back together with the change it describes.
pub struct Activity<'a> {
    pub user_id: Option<i64>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<i64>,
    pub details: Option<Value>,
}

impl<'a> Activity<'a> {
    pub fn new(user_id: i64, action: &'a str, entity_type: &'a str, entity_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            entity_type,
            entity_id: Some(entity_id),
            details: None,
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub async fn record_activity<C: ConnectionTrait>(conn: &C, activity: Activity<'_>) -> AppResult<()> {
    activity_logs::ActiveModel {
        user_id: Set(activity.user_id),
        action: Set(activity.action.to_string()),
        entity_type: Set(activity.entity_type.to_string()),
        entity_id: Set(activity.entity_id),
        details: Set(activity.details),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}
