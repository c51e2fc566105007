use super::MAX_ENTRY_AMOUNT;
use crate::entities::{DurationType, ProductType, product_entity, product_group_entity};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductGroupRequest {
    #[schema(example = "VPN")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductGroupResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<product_group_entity::Model> for ProductGroupResponse {
    fn from(m: product_group_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Monthly plan")]
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub group_id: i64,
    #[schema(example = 100000)]
    pub price: i64,
    #[serde(default)]
    pub commission_rate: f64,
    pub duration_type: DurationType,
    #[serde(default = "default_duration_value")]
    pub duration_value: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub has_test_option: bool,
    #[serde(default)]
    pub test_duration: i32,
}

fn default_duration_value() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<ProductType>,
    pub group_id: Option<i64>,
    pub price: Option<i64>,
    pub commission_rate: Option<f64>,
    pub duration_type: Option<DurationType>,
    pub duration_value: Option<i32>,
    pub is_active: Option<bool>,
    pub has_test_option: Option<bool>,
    pub test_duration: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ProductQuery {
    pub group_id: Option<i64>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub group_id: i64,
    pub price: i64,
    pub commission_rate: f64,
    pub duration_type: DurationType,
    pub duration_value: i32,
    pub is_active: bool,
    pub has_test_option: bool,
    pub test_duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product_entity::Model> for ProductResponse {
    fn from(m: product_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            product_type: m.product_type,
            group_id: m.group_id,
            price: m.price,
            commission_rate: m.commission_rate,
            duration_type: m.duration_type,
            duration_value: m.duration_value,
            is_active: m.is_active,
            has_test_option: m.has_test_option,
            test_duration: m.test_duration,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Longest sellable plan, about a century.
const MAX_DURATION_DAYS: i64 = 36_500;
/// Longest trial.
const MAX_TEST_DURATION_DAYS: i32 = 365;

/// Pricing and duration fields shared by create and update validation.
pub struct ProductRules {
    pub price: i64,
    pub commission_rate: f64,
    pub duration_type: DurationType,
    pub duration_value: i32,
    pub has_test_option: bool,
    pub test_duration: i32,
}

impl ProductRules {
    pub fn validate(&self) -> AppResult<()> {
        if self.price < 0 {
            return Err(AppError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }
        if self.price > MAX_ENTRY_AMOUNT {
            return Err(AppError::ValidationError(format!(
                "Price must not exceed {MAX_ENTRY_AMOUNT}"
            )));
        }
        if !(0.0..=100.0).contains(&self.commission_rate) {
            return Err(AppError::ValidationError(
                "Commission rate must be between 0 and 100".to_string(),
            ));
        }
        if self.duration_type != DurationType::Permanent && self.duration_value < 1 {
            return Err(AppError::ValidationError(
                "Duration value must be at least 1".to_string(),
            ));
        }
        let days = i64::from(self.duration_value)
            * match self.duration_type {
                DurationType::Permanent => 0,
                DurationType::Days => 1,
                DurationType::Months => 30,
                DurationType::Years => 365,
            };
        if days > MAX_DURATION_DAYS {
            return Err(AppError::ValidationError(format!(
                "Duration must not exceed {MAX_DURATION_DAYS} days"
            )));
        }
        if self.has_test_option && self.test_duration < 1 {
            return Err(AppError::ValidationError(
                "Test duration must be at least 1 day".to_string(),
            ));
        }
        if self.test_duration > MAX_TEST_DURATION_DAYS {
            return Err(AppError::ValidationError(format!(
                "Test duration must not exceed {MAX_TEST_DURATION_DAYS} days"
            )));
        }
        Ok(())
    }
}

impl From<&CreateProductRequest> for ProductRules {
    fn from(r: &CreateProductRequest) -> Self {
        Self {
            price: r.price,
            commission_rate: r.commission_rate,
            duration_type: r.duration_type,
            duration_value: r.duration_value,
            has_test_option: r.has_test_option,
            test_duration: r.test_duration,
        }
    }
}
