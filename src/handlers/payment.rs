use super::request_scope;
use crate::entities::PaymentMethod;
use crate::error::{AppError, AppResult};
use crate::external::ReceiptStorage;
use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::{AgentService, PaymentService};
use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use futures_util::StreamExt;
use serde_json::json;

#[derive(Debug, Default)]
struct PaymentForm {
    amount: Option<String>,
    description: Option<String>,
    receipt: Option<(String, Vec<u8>)>,
}

/// Reads the multipart body, stopping as soon as the receipt exceeds `max_bytes`.
async fn read_payment_form(mut payload: Multipart, max_bytes: usize) -> AppResult<PaymentForm> {
    let mut form = PaymentForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {e}")))?;
        let cd = field.content_disposition();
        let name = cd.get_name().unwrap_or_default().to_string();
        let filename = cd.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {e}")))?;
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "Field {name} exceeds {max_bytes} bytes"
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "amount" => form.amount = Some(String::from_utf8_lossy(&data).trim().to_string()),
            "description" => {
                let text = String::from_utf8_lossy(&data).trim().to_string();
                form.description = (!text.is_empty()).then_some(text);
            }
            "receipt_image" if !data.is_empty() => {
                form.receipt = Some((filename.unwrap_or_else(|| "receipt".to_string()), data));
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn new_payment(form: PaymentForm, storage: &ReceiptStorage) -> AppResult<NewPayment> {
    let amount = form
        .amount
        .as_deref()
        .ok_or_else(|| AppError::ValidationError("amount is required".to_string()))?
        .parse::<i64>()
        .map_err(|_| AppError::ValidationError("amount must be an integer".to_string()))?;
    if amount <= 0 {
        return Err(AppError::ValidationError(
            "Payment amount must be positive".to_string(),
        ));
    }

    let receipt_image = match form.receipt {
        Some((name, bytes)) => Some(storage.store(&bytes, &name).await?),
        None => None,
    };

    Ok(NewPayment {
        amount,
        method: PaymentMethod::CardToCard,
        description: form.description,
        receipt_image,
    })
}

#[utoipa::path(
    get,
    path = "/payments",
    tag = "payment",
    params(
        ("status" = Option<PaymentStatus>, Query, description = "pending, completed or rejected"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payments, newest first", body = [PaymentResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_payments(
    payment_service: web::Data<PaymentService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    query: web::Query<PaymentQuery>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    let params = PaginationParams::new(query.page, query.per_page);
    match payment_service
        .list_payments(scope, query.status, &params)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments",
    tag = "payment",
    request_body(content = CreatePaymentForm, content_type = "multipart/form-data"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Payment submitted for review", body = PaymentResponse),
        (status = 400, description = "Invalid amount or receipt")
    )
)]
/// Card-to-card top-up with an optional receipt image, pending admin review.
pub async fn create_payment(
    payment_service: web::Data<PaymentService>,
    storage: web::Data<ReceiptStorage>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse> {
    let current = current_user(&req)?;
    let form = read_payment_form(payload, storage.max_bytes()).await?;
    let payment = new_payment(form, &storage).await?;
    let receipt = payment.receipt_image.clone();
    match payment_service.create_payment(current.user_id, payment).await {
        Ok(payment) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": payment,
            "message": "Payment submitted for review"
        }))),
        Err(e) => {
            if let Some(path) = receipt {
                storage.remove(&path).await;
            }
            Ok(e.error_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payment",
    params(
        ("id" = i64, Path, description = "Payment id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment", body = PaymentResponse),
        (status = 404, description = "Not found or not visible to the caller")
    )
)]
pub async fn get_payment(
    payment_service: web::Data<PaymentService>,
    agent_service: web::Data<AgentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let (_, scope) = request_scope(&agent_service, &req).await?;
    match payment_service.get_payment(scope, path.into_inner()).await {
        Ok(payment) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": payment }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/{id}/approve",
    tag = "payment",
    params(
        ("id" = i64, Path, description = "Payment id")
    ),
    request_body = ReviewPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment completed and credited", body = PaymentResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Payment is not pending")
    )
)]
pub async fn approve_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: Option<web::Json<ReviewPaymentRequest>>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let note = request.and_then(|r| r.into_inner().admin_note);
    match payment_service
        .approve(path.into_inner(), admin.user_id, note)
        .await
    {
        Ok(payment) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": payment }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/{id}/reject",
    tag = "payment",
    params(
        ("id" = i64, Path, description = "Payment id")
    ),
    request_body = ReviewPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment rejected", body = PaymentResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Payment is not pending")
    )
)]
pub async fn reject_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: Option<web::Json<ReviewPaymentRequest>>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let note = request.and_then(|r| r.into_inner().admin_note);
    match payment_service
        .reject(path.into_inner(), admin.user_id, note)
        .await
    {
        Ok(payment) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": payment }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::get().to(list_payments))
            .route("", web::post().to(create_payment))
            .route("/{id}", web::get().to(get_payment))
            .route("/{id}/approve", web::post().to(approve_payment))
            .route("/{id}/reject", web::post().to(reject_payment)),
    );
}
