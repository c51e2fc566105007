use super::request_scope;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{AgentService, SubscriptionService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscription",
    params(
        ("status" = Option<SubscriptionStatus>, Query, description = "Filter by status"),
        ("product_id" = Option<i64>, Query, description = "Filter by product"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscriptions, newest first", body = [SubscriptionResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_subscriptions(
    subscription_service: web::Data<SubscriptionService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<SubscriptionQuery>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let params = PaginationParams::new(query.page, query.per_page);
    match subscription_service
        .list(scope, query.status, query.product_id, &params)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscription",
    request_body = CreateSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Pending subscription created", body = SubscriptionResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Agents may only sell for themselves"),
        (status = 404, description = "Product or agent not found"),
        (status = 409, description = "Product inactive or without test option")
    )
)]
pub async fn create_subscription(
    subscription_service: web::Data<SubscriptionService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    request: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let (current, scope) = request_scope(&agent_service, &req).await?;
    match subscription_service
        .create(scope, request.into_inner(), current.user_id)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": sub }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscription",
    params(
        ("id" = i64, Path, description = "Subscription id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 404, description = "Not found or not visible to the caller")
    )
)]
pub async fn get_subscription(
    subscription_service: web::Data<SubscriptionService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    match subscription_service.get(scope, path.into_inner()).await {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": sub }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/subscriptions/{id}",
    tag = "subscription",
    params(
        ("id" = i64, Path, description = "Subscription id")
    ),
    request_body = UpdateSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = SubscriptionResponse),
        (status = 404, description = "Not found or not visible to the caller"),
        (status = 409, description = "Subscription is not pending")
    )
)]
pub async fn update_subscription(
    subscription_service: web::Data<SubscriptionService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    match subscription_service
        .update(scope, path.into_inner(), request.into_inner())
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": sub }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/activate",
    tag = "subscription",
    params(
        ("id" = i64, Path, description = "Subscription id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Activated and charged", body = SubscriptionResponse),
        (status = 400, description = "Insufficient credit"),
        (status = 404, description = "Not found or not visible to the caller"),
        (status = 409, description = "Subscription is not pending")
    )
)]
/// Charges the owning agent's credit and starts the subscription period.
pub async fn activate_subscription(
    subscription_service: web::Data<SubscriptionService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let (current, scope) = request_scope(&agent_service, &req).await?;
    match subscription_service
        .activate(scope, path.into_inner(), current.user_id)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": sub }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/suspend",
    tag = "subscription",
    params(
        ("id" = i64, Path, description = "Subscription id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Suspended", body = SubscriptionResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Subscription is not active")
    )
)]
pub async fn suspend_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    match subscription_service
        .suspend(path.into_inner(), admin.user_id)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": sub }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("", web::get().to(list_subscriptions))
            .route("", web::post().to(create_subscription))
            .route("/{id}", web::get().to(get_subscription))
            .route("/{id}", web::put().to(update_subscription))
            .route("/{id}/activate", web::post().to(activate_subscription))
            .route("/{id}/suspend", web::post().to(suspend_subscription)),
    );
}
