use crate::models::*;
use crate::services::AuthService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service
        .login(&request.identifier, &request.password)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/otp/request",
    tag = "auth",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Code sent", body = OtpRequestResponse),
        (status = 400, description = "Invalid mobile number")
    )
)]
/// Unknown mobiles are registered as agents before the code is sent.
pub async fn request_otp(
    auth_service: web::Data<AuthService>,
    request: web::Json<OtpRequest>,
) -> Result<HttpResponse> {
    match auth_service.request_otp(&request.mobile).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "Verification code sent"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    tag = "auth",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid or expired code"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn verify_otp(
    auth_service: web::Data<AuthService>,
    request: web::Json<OtpVerifyRequest>,
) -> Result<HttpResponse> {
    match auth_service.verify_otp(&request.mobile, &request.code).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Token refreshed", body = AccessTokenResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh(&request.refresh_token).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/otp/request", web::post().to(request_otp))
            .route("/otp/verify", web::post().to(verify_otp))
            .route("/refresh", web::post().to(refresh)),
    );
}
