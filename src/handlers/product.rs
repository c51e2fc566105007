use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::ProductService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/products",
    tag = "product",
    params(
        ("group_id" = Option<i64>, Query, description = "Filter by product group"),
        ("is_active" = Option<bool>, Query, description = "Filter by availability"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product page", body = [ProductResponse])
    )
)]
pub async fn list_products(
    product_service: web::Data<ProductService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    let params = PaginationParams::new(query.page, query.per_page);
    match product_service
        .list_products(query.group_id, query.is_active, &params)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "product",
    request_body = CreateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid price, commission or duration"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product group not found")
    )
)]
pub async fn create_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    request: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service.create_product(request.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_product(
    product_service: web::Data<ProductService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match product_service.get_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    request_body = UpdateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid price, commission or duration"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service
        .update_product(path.into_inner(), request.into_inner())
        .await
    {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products/{id}/activate",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product available for sale", body = ProductResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn activate_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service.activate_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products/{id}/deactivate",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product withdrawn from sale", body = ProductResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn deactivate_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service.deactivate_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": product }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/product-groups",
    tag = "product",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All product groups by name", body = [ProductGroupResponse])
    )
)]
pub async fn list_product_groups(product_service: web::Data<ProductService>) -> Result<HttpResponse> {
    match product_service.list_groups().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/product-groups",
    tag = "product",
    request_body = ProductGroupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Group created", body = ProductGroupResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_product_group(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    request: web::Json<ProductGroupRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service.create_group(request.into_inner()).await {
        Ok(group) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/product-groups/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product group id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Group", body = ProductGroupResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_product_group(
    product_service: web::Data<ProductService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match product_service.get_group(path.into_inner()).await {
        Ok(group) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/product-groups/{id}",
    tag = "product",
    params(
        ("id" = i64, Path, description = "Product group id")
    ),
    request_body = ProductGroupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Group updated", body = ProductGroupResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_product_group(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ProductGroupRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match product_service
        .update_group(path.into_inner(), request.into_inner())
        .await
    {
        Ok(group) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": group }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(create_product))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}/activate", web::post().to(activate_product))
            .route("/{id}/deactivate", web::post().to(deactivate_product)),
    )
    .service(
        web::scope("/product-groups")
            .route("", web::get().to(list_product_groups))
            .route("", web::post().to(create_product_group))
            .route("/{id}", web::get().to(get_product_group))
            .route("/{id}", web::put().to(update_product_group)),
    );
}
