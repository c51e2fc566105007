mod support;

use sea_orm::{EntityTrait, PaginatorTrait};
use std::collections::BTreeMap;
use support::*;
use vesta_backend::AppError;
use vesta_backend::entities::{activity_log_entity, setting_entity};
use vesta_backend::models::{CreateSettingRequest, UpdateSettingRequest};
use vesta_backend::services::{DEFAULT_SETTINGS, SettingService};

fn request(key: &str, value: &str, category: &str) -> CreateSettingRequest {
    CreateSettingRequest {
        key: key.to_string(),
        value: value.to_string(),
        description: None,
        category: category.to_string(),
    }
}

#[tokio::test]
async fn test_defaults_are_seeded_once() {
    let db = setup_db().await;
    let settings = SettingService::new(db.clone());

    assert_eq!(
        settings.ensure_defaults().await.unwrap(),
        DEFAULT_SETTINGS.len() as u64
    );
    assert_eq!(settings.ensure_defaults().await.unwrap(), 0);
    assert_eq!(
        setting_entity::Entity::find().count(&db).await.unwrap(),
        DEFAULT_SETTINGS.len() as u64
    );
}

#[tokio::test]
async fn test_seeding_keeps_edited_values() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let settings = SettingService::new(db.clone());
    settings
        .create(request("site_name", "My Panel", "general"), admin.id)
        .await
        .unwrap();

    assert_eq!(
        settings.ensure_defaults().await.unwrap(),
        DEFAULT_SETTINGS.len() as u64 - 1
    );
    assert_eq!(settings.get("site_name").await.unwrap().value, "My Panel");
}

#[tokio::test]
async fn test_create_rejects_duplicate_and_blank_keys() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let settings = SettingService::new(db.clone());

    let created = settings
        .create(request(" support_phone ", "021-000", "general"), admin.id)
        .await
        .unwrap();
    assert_eq!(created.key, "support_phone");

    assert!(matches!(
        settings
            .create(request("support_phone", "other", "general"), admin.id)
            .await,
        Err(AppError::AlreadyExists(_))
    ));
    assert!(matches!(
        settings.create(request("  ", "x", "general"), admin.id).await,
        Err(AppError::ValidationError(_))
    ));
    assert_eq!(
        activity_log_entity::Entity::find().count(&db).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_update_changes_value_and_optional_fields() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let settings = SettingService::new(db.clone());
    settings.ensure_defaults().await.unwrap();

    let updated = settings
        .update(
            "card_to_card_info",
            UpdateSettingRequest {
                value: "6037-0000-0000-0001".to_string(),
                description: None,
                category: None,
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.value, "6037-0000-0000-0001");
    assert_eq!(updated.category, "payment");
    assert!(updated.description.is_some());

    let moved = settings
        .update(
            "site_name",
            UpdateSettingRequest {
                value: "Vesta".to_string(),
                description: Some("Brand".to_string()),
                category: Some("branding".to_string()),
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(moved.category, "branding");
    assert_eq!(moved.description.as_deref(), Some("Brand"));
    assert!(settings.by_category("general").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let settings = SettingService::new(db.clone());

    assert!(matches!(
        settings.get("nope").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        settings
            .update("nope", UpdateSettingRequest::default(), admin.id)
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_by_category_maps_keys_to_values() {
    let db = setup_db().await;
    let settings = SettingService::new(db.clone());
    settings.ensure_defaults().await.unwrap();

    let business = settings.by_category("business").await.unwrap();
    assert_eq!(business.len(), 1);
    assert_eq!(business["default_commission_rate"], "10");
    assert!(settings.by_category("unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_update_counts_only_existing_keys() {
    let db = setup_db().await;
    let admin = create_admin(&db).await;
    let settings = SettingService::new(db.clone());
    settings.ensure_defaults().await.unwrap();

    let values = BTreeMap::from([
        ("site_name".to_string(), "Vesta".to_string()),
        ("telegram_notifications".to_string(), "false".to_string()),
        ("no_such_key".to_string(), "x".to_string()),
    ]);
    assert_eq!(settings.bulk_update(values, admin.id).await.unwrap(), 2);
    assert_eq!(settings.get("site_name").await.unwrap().value, "Vesta");
    assert_eq!(
        settings.get("telegram_notifications").await.unwrap().value,
        "false"
    );
    assert!(matches!(
        settings.get("no_such_key").await,
        Err(AppError::NotFound(_))
    ));

    assert_eq!(
        settings.bulk_update(BTreeMap::new(), admin.id).await.unwrap(),
        0
    );
    // one audit row for the whole batch, none for the empty one
    assert_eq!(
        activity_log_entity::Entity::find().count(&db).await.unwrap(),
        1
    );
}
