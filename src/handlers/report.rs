use super::request_scope;
use crate::models::*;
use crate::services::{AgentService, ReportService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "report",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Admin overview, or the caller's own figures for agents", body = Dashboard)
    )
)]
pub async fn dashboard(
    report_service: web::Data<ReportService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let result = match scope.agent_id() {
        None => report_service.admin_dashboard().await.map(Dashboard::Admin),
        Some(agent_id) => report_service
            .agent_dashboard(agent_id)
            .await
            .map(Dashboard::Agent),
    };
    match result {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/sales",
    tag = "report",
    params(
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to 30 days before end_date"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today"),
        ("agent_id" = Option<i64>, Query, description = "Admins only; agents always see their own"),
        ("product_id" = Option<i64>, Query, description = "Filter by product")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Sales totals with breakdowns", body = SalesReport),
        (status = 400, description = "start_date after end_date")
    )
)]
pub async fn sales_report(
    report_service: web::Data<ReportService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let agent_id = scope.agent_id().or(query.agent_id);
    match report_service
        .sales_report(query.start_date, query.end_date, agent_id, query.product_id)
        .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": report }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reports/financial",
    tag = "report",
    params(
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to 30 days before end_date"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today"),
        ("agent_id" = Option<i64>, Query, description = "Admins only; agents always see their own")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deposits, withdrawals and payment totals", body = FinancialReport),
        (status = 400, description = "start_date after end_date")
    )
)]
pub async fn financial_report(
    report_service: web::Data<ReportService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let agent_id = scope.agent_id().or(query.agent_id);
    match report_service
        .financial_report(query.start_date, query.end_date, agent_id)
        .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": report }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn report_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("/dashboard", web::get().to(dashboard))
            .route("/sales", web::get().to(sales_report))
            .route("/financial", web::get().to(financial_report)),
    );
}
