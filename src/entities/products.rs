use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "product_type")]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[sea_orm(string_value = "api_based")]
    ApiBased,
    #[sea_orm(string_value = "user_password")]
    UserPassword,
    #[sea_orm(string_value = "license")]
    License,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::ApiBased => write!(f, "api_based"),
            ProductType::UserPassword => write!(f, "user_password"),
            ProductType::License => write!(f, "license"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "duration_type")]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    #[sea_orm(string_value = "days")]
    Days,
    #[sea_orm(string_value = "months")]
    Months,
    #[sea_orm(string_value = "years")]
    Years,
    #[sea_orm(string_value = "permanent")]
    Permanent,
}

impl std::fmt::Display for DurationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationType::Days => write!(f, "days"),
            DurationType::Months => write!(f, "months"),
            DurationType::Years => write!(f, "years"),
            DurationType::Permanent => write!(f, "permanent"),
        }
    }
}

/// Sellable plan. Prices are in the smallest currency unit.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub group_id: i64,
    pub price: i64,
    /// Percentage, 0..=100
    pub commission_rate: f64,
    pub duration_type: DurationType,
    pub duration_value: i32,
    pub is_active: bool,
    pub has_test_option: bool,
    /// Trial length in days
    pub test_duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
