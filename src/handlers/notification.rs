use crate::middlewares::current_user;
use crate::models::*;
use crate::services::NotificationService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notification",
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread notifications"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = [NotificationResponse])
    )
)]
pub async fn list_notifications(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    let params = PaginationParams::new(query.page, query.per_page);
    match notification_service
        .list(current.user_id, query.unread_only, &params)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notification",
    params(
        ("id" = i64, Path, description = "Notification id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Marked as read", body = NotificationResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn mark_as_read(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    match notification_service
        .mark_as_read(current.user_id, path.into_inner())
        .await
    {
        Ok(n) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": n }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notification",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Number of notifications marked", body = MarkAllReadResponse)
    )
)]
pub async fn mark_all_as_read(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    match notification_service.mark_all_as_read(current.user_id).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": MarkAllReadResponse { updated }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn notification_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/read-all", web::post().to(mark_all_as_read))
            .route("/{id}/read", web::post().to(mark_as_read)),
    );
}
