use super::request_scope;
use crate::error::AppError;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::AgentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/agents",
    tag = "agent",
    params(
        ("search" = Option<String>, Query, description = "Matches names, mobile, email, business name"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Agent page", body = [AgentResponse]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_agents(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<AgentQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let params = PaginationParams::new(query.page, query.per_page);
    match agent_service.list(query.search.as_deref(), &params).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/agents",
    tag = "agent",
    request_body = CreateAgentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Agent and empty credit created", body = AgentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User or group not found"),
        (status = 409, description = "User is already an agent")
    )
)]
pub async fn create_agent(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    request: web::Json<CreateAgentRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let request = request.into_inner();
    match agent_service.create(request.user_id, request.group_ids).await {
        Ok(agent) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": agent }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/agents/{id}",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Agent with balance and groups", body = AgentResponse),
        (status = 403, description = "Another agent"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_agent(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let agent_id = path.into_inner();
    let (_, scope) = request_scope(&agent_service, &req).await?;
    if !scope.permits(agent_id) {
        return Ok(AppError::Forbidden.error_response());
    }
    match agent_service.get(agent_id).await {
        Ok(agent) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": agent }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/agents/{id}",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent id")
    ),
    request_body = UpdateAgentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Group memberships replaced", body = AgentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Agent or group not found")
    )
)]
pub async fn update_agent(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateAgentRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service
        .update(path.into_inner(), request.into_inner().group_ids)
        .await
    {
        Ok(agent) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": agent }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/agents/{id}/activate",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Agent's user account enabled", body = AgentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn activate_agent(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service.activate(path.into_inner()).await {
        Ok(agent) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": agent }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/agents/{id}/deactivate",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Agent's user account disabled", body = AgentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn deactivate_agent(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service.deactivate(path.into_inner()).await {
        Ok(agent) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": agent }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/agent-groups",
    tag = "agent",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All agent groups by name", body = [AgentGroupResponse])
    )
)]
pub async fn list_agent_groups(agent_service: web::Data<AgentService>) -> Result<HttpResponse> {
    match agent_service.list_groups().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/agent-groups",
    tag = "agent",
    request_body = AgentGroupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Group created", body = AgentGroupResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_agent_group(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    request: web::Json<AgentGroupRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service.create_group(request.into_inner()).await {
        Ok(group) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/agent-groups/{id}",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent group id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Group", body = AgentGroupResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_agent_group(
    agent_service: web::Data<AgentService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match agent_service.get_group(path.into_inner()).await {
        Ok(group) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/agent-groups/{id}",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent group id")
    ),
    request_body = AgentGroupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Group updated", body = AgentGroupResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_agent_group(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AgentGroupRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service
        .update_group(path.into_inner(), request.into_inner())
        .await
    {
        Ok(group) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/agent-groups/{id}/members",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent group id")
    ),
    request_body = AgentGroupMemberRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member added"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Group or agent not found"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn add_group_member(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AgentGroupMemberRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match agent_service
        .add_member(path.into_inner(), request.agent_id)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Member added"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/agent-groups/{id}/members/{agent_id}",
    tag = "agent",
    params(
        ("id" = i64, Path, description = "Agent group id"),
        ("agent_id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not a member")
    )
)]
pub async fn remove_group_member(
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let (group_id, agent_id) = path.into_inner();
    match agent_service.remove_member(group_id, agent_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Member removed"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn agent_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/agents")
            .route("", web::get().to(list_agents))
            .route("", web::post().to(create_agent))
            .route("/{id}", web::get().to(get_agent))
            .route("/{id}", web::put().to(update_agent))
            .route("/{id}/activate", web::post().to(activate_agent))
            .route("/{id}/deactivate", web::post().to(deactivate_agent)),
    )
    .service(
        web::scope("/agent-groups")
            .route("", web::get().to(list_agent_groups))
            .route("", web::post().to(create_agent_group))
            .route("/{id}", web::get().to(get_agent_group))
            .route("/{id}", web::put().to(update_agent_group))
            .route("/{id}/members", web::post().to(add_group_member))
            .route("/{id}/members/{agent_id}", web::delete().to(remove_group_member)),
    );
}
