use crate::entities::{PaymentMethod, PaymentStatus, payment_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment submission after the multipart body has been parsed and the receipt stored.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: i64,
    pub method: PaymentMethod,
    pub description: Option<String>,
    pub receipt_image: Option<String>,
}

/// Multipart form accepted by `POST /payments` (documentation only).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreatePaymentForm {
    #[schema(example = 1000000)]
    pub amount: i64,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub receipt_image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReviewPaymentRequest {
    #[schema(example = "invalid receipt")]
    pub admin_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i64,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: i64,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub receipt_image: Option<String>,
    pub admin_note: Option<String>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<payment_entity::Model> for PaymentResponse {
    fn from(m: payment_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            method: m.method,
            amount: m.amount,
            status: m.status,
            description: m.description,
            receipt_image: m.receipt_image,
            admin_note: m.admin_note,
            approved_by: m.approved_by,
            approved_at: m.approved_at,
            created_at: m.created_at,
        }
    }
}
