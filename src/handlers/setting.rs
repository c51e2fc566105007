use crate::error::AppError;
use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::SettingService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// Admins read everything; other callers only public categories.
fn can_read(current: &CurrentUser, category: &str) -> bool {
    current.is_admin() || is_public_category(category)
}

#[utoipa::path(
    get,
    path = "/settings",
    tag = "setting",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All settings by category and key", body = [SettingResponse]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_settings(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match setting_service.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/settings",
    tag = "setting",
    request_body = CreateSettingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Setting created", body = SettingResponse),
        (status = 400, description = "Invalid key or category"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Key already exists")
    )
)]
pub async fn create_setting(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
    request: web::Json<CreateSettingRequest>,
) -> Result<HttpResponse> {
    let current = require_admin(&req)?;
    match setting_service
        .create(request.into_inner(), current.user_id)
        .await
    {
        Ok(setting) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": setting }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/settings/{key}",
    tag = "setting",
    params(
        ("key" = String, Path, description = "Setting key")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Setting", body = SettingResponse),
        (status = 403, description = "Category not readable by the caller"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_setting(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    match setting_service.get(&path.into_inner()).await {
        Ok(setting) if can_read(&current, &setting.category) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": setting })))
        }
        Ok(_) => Ok(AppError::Forbidden.error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/settings/{key}",
    tag = "setting",
    params(
        ("key" = String, Path, description = "Setting key")
    ),
    request_body = UpdateSettingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Setting updated", body = SettingResponse),
        (status = 400, description = "Invalid category"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_setting(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<UpdateSettingRequest>,
) -> Result<HttpResponse> {
    let current = require_admin(&req)?;
    match setting_service
        .update(&path.into_inner(), request.into_inner(), current.user_id)
        .await
    {
        Ok(setting) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": setting }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/settings/category/{category}",
    tag = "setting",
    params(
        ("category" = String, Path, description = "Setting category")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Key to value map of the category"),
        (status = 403, description = "Category not readable by the caller")
    )
)]
pub async fn get_settings_by_category(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    let category = path.into_inner();
    if !can_read(&current, &category) {
        return Ok(AppError::Forbidden.error_response());
    }
    match setting_service.by_category(&category).await {
        Ok(values) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": values }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/settings/bulk-update",
    tag = "setting",
    request_body = BulkUpdateSettingsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Number of existing settings changed", body = BulkUpdateResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn bulk_update_settings(
    setting_service: web::Data<SettingService>,
    req: HttpRequest,
    request: web::Json<BulkUpdateSettingsRequest>,
) -> Result<HttpResponse> {
    let current = require_admin(&req)?;
    match setting_service
        .bulk_update(request.into_inner().settings, current.user_id)
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": BulkUpdateResponse { updated }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn setting_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/settings")
            .route("", web::get().to(list_settings))
            .route("", web::post().to(create_setting))
            .route("/bulk-update", web::put().to(bulk_update_settings))
            .route("/category/{category}", web::get().to(get_settings_by_category))
            .route("/{key}", web::get().to(get_setting))
            .route("/{key}", web::put().to(update_setting)),
    );
}
