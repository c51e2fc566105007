use crate::entities::setting_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Categories any signed-in user may read. Agents need the card-to-card
/// details before they can submit a deposit.
pub const PUBLIC_SETTING_CATEGORIES: &[&str] = &["payment"];

pub fn is_public_category(category: &str) -> bool {
    PUBLIC_SETTING_CATEGORIES.contains(&category)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSettingRequest {
    #[schema(example = "site_name")]
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    #[serde(default = "default_category")]
    #[schema(example = "general")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSettingRequest {
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Key to new value; keys that do not exist are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BulkUpdateSettingsRequest {
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingResponse {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<setting_entity::Model> for SettingResponse {
    fn from(m: setting_entity::Model) -> Self {
        Self {
            id: m.id,
            key: m.key,
            value: m.value,
            description: m.description,
            category: m.category,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults_to_general() {
        let req: CreateSettingRequest =
            serde_json::from_str(r#"{"key":"site_name","value":"Vesta"}"#).unwrap();
        assert_eq!(req.category, "general");
        assert!(req.description.is_none());
    }

    #[test]
    fn test_only_payment_is_public() {
        assert!(is_public_category("payment"));
        assert!(!is_public_category("business"));
        assert!(!is_public_category("Payment"));
    }
}
