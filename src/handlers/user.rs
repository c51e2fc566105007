use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::UserService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "user",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(user_service: web::Data<UserService>, req: HttpRequest) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    match user_service.get_user(current.user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "user",
    params(
        ("search" = Option<String>, Query, description = "Matches username, names, mobile, email"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User page", body = [UserResponse]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let params = PaginationParams::new(query.page, query.per_page);
    match user_service
        .list_users(query.search.as_deref(), &params)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "user",
    request_body = CreateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Mobile, username or email taken")
    )
)]
pub async fn create_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match user_service.create_user(request.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "user",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match user_service.get_user(path.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(get_me))
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user)),
    );
}
