use super::request_scope;
use crate::error::AppError;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{AgentService, CreditService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn ensure_permitted(scope: AgentScope, agent_id: i64) -> Result<(), AppError> {
    if !scope.permits(agent_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/credits",
    tag = "credit",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All credits for admins, the caller's own for agents", body = [CreditResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_credits(
    credit_service: web::Data<CreditService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let params = PaginationParams::new(query.page, query.per_page);
    let result = match scope.agent_id() {
        None => credit_service.list_credits(&params).await,
        Some(agent_id) => credit_service
            .get_credit(agent_id)
            .await
            .map(|credit| PaginatedResponse::new(vec![credit], &params, 1)),
    };
    match result {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credits/{agent_id}",
    tag = "credit",
    params(
        ("agent_id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Credit, created empty on first access", body = CreditResponse),
        (status = 403, description = "Another agent's credit"),
        (status = 404, description = "Agent not found")
    )
)]
pub async fn get_credit(
    credit_service: web::Data<CreditService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let agent_id = path.into_inner();
    let (_, scope) = request_scope(&agent_service, &req).await?;
    ensure_permitted(scope, agent_id)?;
    match credit_service.get_credit(agent_id).await {
        Ok(credit) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": credit }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credits/{agent_id}/audit",
    tag = "credit",
    params(
        ("agent_id" = i64, Path, description = "Agent id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Cached balance against the transaction sum", body = BalanceAudit),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Agent not found")
    )
)]
pub async fn audit_credit(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match credit_service.audit_balance(path.into_inner()).await {
        Ok(audit) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": audit }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credits/{agent_id}/transactions",
    tag = "credit",
    params(
        ("agent_id" = i64, Path, description = "Agent id"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = [TransactionResponse]),
        (status = 403, description = "Another agent's credit")
    )
)]
pub async fn list_transactions(
    credit_service: web::Data<CreditService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    let agent_id = path.into_inner();
    let (_, scope) = request_scope(&agent_service, &req).await?;
    ensure_permitted(scope, agent_id)?;
    let params = PaginationParams::new(query.page, query.per_page);
    match credit_service.list_transactions(agent_id, &params).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/credits/{agent_id}/transactions",
    tag = "credit",
    params(
        ("agent_id" = i64, Path, description = "Agent id")
    ),
    request_body = AddTransactionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated credit", body = CreditResponse),
        (status = 400, description = "Amount sign does not match the type"),
        (status = 400, description = "Insufficient credit"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn add_transaction(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AddTransactionRequest>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let request = request.into_inner();
    let entry = LedgerEntry {
        agent_id: path.into_inner(),
        amount: request.amount,
        transaction_type: request.transaction_type,
        description: request.description,
        created_by: Some(admin.user_id),
        payment_id: None,
        subscription_id: None,
    };
    match credit_service.add_transaction(entry).await {
        Ok(credit) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CreditResponse::from(credit)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn credit_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/credits")
            .route("", web::get().to(list_credits))
            .route("/{agent_id}", web::get().to(get_credit))
            .route("/{agent_id}/audit", web::get().to(audit_credit))
            .route("/{agent_id}/transactions", web::get().to(list_transactions))
            .route("/{agent_id}/transactions", web::post().to(add_transaction)),
    );
}
