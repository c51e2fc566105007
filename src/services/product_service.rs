use crate::entities::{product_entity as products, product_group_entity as product_groups};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateProductRequest, PaginatedResponse, PaginationParams, ProductGroupRequest,
    ProductGroupResponse, ProductResponse, ProductRules, UpdateProductRequest,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

#[derive(Clone)]
pub struct ProductService {
    pool: DatabaseConnection,
}

impl ProductService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    // ---- product groups ----

    pub async fn create_group(&self, request: ProductGroupRequest) -> AppResult<ProductGroupResponse> {
        let name = required_name(&request.name)?;
        let now = Utc::now();
        let group = product_groups::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(group.into())
    }

    pub async fn update_group(
        &self,
        id: i64,
        request: ProductGroupRequest,
    ) -> AppResult<ProductGroupResponse> {
        let name = required_name(&request.name)?;
        let group = find_group(&self.pool, id).await?;
        let mut am = group.into_active_model();
        am.name = Set(name);
        am.description = Set(request.description);
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }

    pub async fn get_group(&self, id: i64) -> AppResult<ProductGroupResponse> {
        Ok(find_group(&self.pool, id).await?.into())
    }

    pub async fn list_groups(&self) -> AppResult<Vec<ProductGroupResponse>> {
        let groups = product_groups::Entity::find()
            .order_by_asc(product_groups::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    // ---- products ----

    pub async fn create_product(&self, request: CreateProductRequest) -> AppResult<ProductResponse> {
        let name = required_name(&request.name)?;
        ProductRules::from(&request).validate()?;
        find_group(&self.pool, request.group_id).await?;

        let now = Utc::now();
        let product = products::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            product_type: Set(request.product_type),
            group_id: Set(request.group_id),
            price: Set(request.price),
            commission_rate: Set(request.commission_rate),
            duration_type: Set(request.duration_type),
            duration_value: Set(request.duration_value),
            is_active: Set(request.is_active),
            has_test_option: Set(request.has_test_option),
            test_duration: Set(request.test_duration),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Product {} created in group {}", product.id, product.group_id);
        Ok(product.into())
    }

    /// Partial update. Existing subscriptions keep their own price and
    /// duration snapshot.
    pub async fn update_product(
        &self,
        id: i64,
        request: UpdateProductRequest,
    ) -> AppResult<ProductResponse> {
        let current = find_product(&self.pool, id).await?;

        let rules = ProductRules {
            price: request.price.unwrap_or(current.price),
            commission_rate: request.commission_rate.unwrap_or(current.commission_rate),
            duration_type: request.duration_type.unwrap_or(current.duration_type),
            duration_value: request.duration_value.unwrap_or(current.duration_value),
            has_test_option: request.has_test_option.unwrap_or(current.has_test_option),
            test_duration: request.test_duration.unwrap_or(current.test_duration),
        };
        rules.validate()?;

        if let Some(group_id) = request.group_id {
            find_group(&self.pool, group_id).await?;
        }

        let mut am = current.into_active_model();
        if let Some(name) = request.name {
            am.name = Set(required_name(&name)?);
        }
        if let Some(description) = request.description {
            am.description = Set(Some(description));
        }
        if let Some(product_type) = request.product_type {
            am.product_type = Set(product_type);
        }
        if let Some(group_id) = request.group_id {
            am.group_id = Set(group_id);
        }
        if let Some(is_active) = request.is_active {
            am.is_active = Set(is_active);
        }
        am.price = Set(rules.price);
        am.commission_rate = Set(rules.commission_rate);
        am.duration_type = Set(rules.duration_type);
        am.duration_value = Set(rules.duration_value);
        am.has_test_option = Set(rules.has_test_option);
        am.test_duration = Set(rules.test_duration);
        am.updated_at = Set(Utc::now());

        Ok(am.update(&self.pool).await?.into())
    }

    pub async fn get_product(&self, id: i64) -> AppResult<ProductResponse> {
        Ok(find_product(&self.pool, id).await?.into())
    }

    pub async fn list_products(
        &self,
        group_id: Option<i64>,
        is_active: Option<bool>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<ProductResponse>> {
        let mut query = products::Entity::find();
        if let Some(group_id) = group_id {
            query = query.filter(products::Column::GroupId.eq(group_id));
        }
        if let Some(is_active) = is_active {
            query = query.filter(products::Column::IsActive.eq(is_active));
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_asc(products::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    pub async fn activate_product(&self, id: i64) -> AppResult<ProductResponse> {
        self.set_active(id, true).await
    }

    pub async fn deactivate_product(&self, id: i64) -> AppResult<ProductResponse> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: i64, is_active: bool) -> AppResult<ProductResponse> {
        let product = find_product(&self.pool, id).await?;
        if product.is_active == is_active {
            return Ok(product.into());
        }
        let mut am = product.into_active_model();
        am.is_active = Set(is_active);
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    Ok(name.to_string())
}

async fn find_group<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<product_groups::Model> {
    product_groups::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product group {id} not found")))
}

async fn find_product<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<products::Model> {
    products::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))
}
