use crate::entities::{DurationType, SubscriptionStatus, subscription_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub product_id: i64,
    /// Required for admins; agents always sell for themselves
    pub agent_id: Option<i64>,
    #[schema(example = "Customer Name")]
    pub customer_name: String,
    pub customer_note: Option<String>,
    /// Overrides the product price
    pub price: Option<i64>,
    #[serde(default)]
    pub is_test: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub customer_name: Option<String>,
    pub customer_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubscriptionQuery {
    pub status: Option<SubscriptionStatus>,
    pub product_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: i64,
    pub product_id: i64,
    pub agent_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_note: Option<String>,
    pub status: SubscriptionStatus,
    pub price: i64,
    pub is_test: bool,
    pub duration_type: DurationType,
    pub duration_value: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Whole days remaining, only for active subscriptions with an end date
    pub days_left: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionResponse {
    pub fn from_model(m: subscription_entity::Model, now: DateTime<Utc>) -> Self {
        let days_left = match (m.status, m.end_date) {
            (SubscriptionStatus::Active, Some(end)) => Some((end - now).num_days().max(0)),
            _ => None,
        };
        Self {
            id: m.id,
            product_id: m.product_id,
            agent_id: m.agent_id,
            customer_id: m.customer_id,
            customer_name: m.customer_name,
            customer_note: m.customer_note,
            status: m.status,
            price: m.price,
            is_test: m.is_test,
            duration_type: m.duration_type,
            duration_value: m.duration_value,
            start_date: m.start_date,
            end_date: m.end_date,
            days_left,
            created_at: m.created_at,
        }
    }
}

impl From<subscription_entity::Model> for SubscriptionResponse {
    fn from(m: subscription_entity::Model) -> Self {
        Self::from_model(m, Utc::now())
    }
}
