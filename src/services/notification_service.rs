use crate::entities::{notification_entity as notifications, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::external::TelegramService;
use crate::models::{Notice, NotificationResponse, PaginatedResponse, PaginationParams};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Fire-and-forget delivery of user-facing messages.
/// Implementations must return immediately and never surface delivery failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Clone)]
pub struct NotificationService {
    pool: DatabaseConnection,
    telegram: TelegramService,
}

impl NotificationService {
    pub fn new(pool: DatabaseConnection, telegram: TelegramService) -> Self {
        Self { pool, telegram }
    }

    /// Persist the notice and push it to Telegram when the user has a chat id.
    pub async fn deliver(&self, notice: Notice) -> AppResult<notifications::Model> {
        let saved = notifications::ActiveModel {
            user_id: Set(notice.user_id),
            tag: Set(notice.tag),
            title: Set(notice.title.clone()),
            message: Set(notice.message.clone()),
            is_read: Set(false),
            is_sent_to_telegram: Set(false),
            related_id: Set(notice.related_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        if !self.telegram.is_configured() {
            return Ok(saved);
        }

        let chat_id = users::Entity::find_by_id(notice.user_id)
            .one(&self.pool)
            .await?
            .and_then(|u| u.telegram_id);

        let Some(chat_id) = chat_id else {
            return Ok(saved);
        };

        let text = format!("{}\n\n{}", notice.title, notice.message);
        match self.telegram.send_message(&chat_id, &text).await {
            Ok(true) => {
                let mut am = saved.into_active_model();
                am.is_sent_to_telegram = Set(true);
                Ok(am.update(&self.pool).await?)
            }
            Ok(false) => Ok(saved),
            Err(e) => {
                log::warn!(
                    "Telegram delivery of notification {} failed: {e}",
                    saved.id
                );
                Ok(saved)
            }
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<NotificationResponse>> {
        let mut query = notifications::Entity::find().filter(notifications::Column::UserId.eq(user_id));
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
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

    pub async fn mark_as_read(&self, user_id: i64, id: i64) -> AppResult<NotificationResponse> {
        let notification = notifications::Entity::find_by_id(id)
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if notification.is_read {
            return Ok(notification.into());
        }

        let mut am = notification.into_active_model();
        am.is_read = Set(true);
        Ok(am.update(&self.pool).await?.into())
    }

    pub async fn mark_all_as_read(&self, user_id: i64) -> AppResult<u64> {
        let res = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }
}

impl Notifier for NotificationService {
    fn notify(&self, notice: Notice) {
        let service = self.clone();
        tokio::spawn(async move {
            let user_id = notice.user_id;
            if let Err(e) = service.deliver(notice).await {
                log::error!("Failed to deliver notification to user {user_id}: {e}");
            }
        });
    }
}
