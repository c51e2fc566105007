use crate::entities::{NotificationType, notification_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A message for one user, handed to a `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub tag: NotificationType,
    pub related_id: Option<i64>,
}

impl Notice {
    pub fn new(
        user_id: i64,
        tag: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            tag,
            related_id: None,
        }
    }

    pub fn related_to(mut self, id: i64) -> Self {
        self.related_id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i64,
    pub tag: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<notification_entity::Model> for NotificationResponse {
    fn from(m: notification_entity::Model) -> Self {
        Self {
            id: m.id,
            tag: m.tag,
            title: m.title,
            message: m.message,
            is_read: m.is_read,
            related_id: m.related_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
