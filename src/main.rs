use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use vesta_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{ReceiptStorage, SmsService, TelegramService},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::{JwtService, MemoryStore},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let sms_service = SmsService::new(config.sms.clone());
    let telegram_service = TelegramService::new(config.telegram.clone());
    let receipt_storage = ReceiptStorage::new(&config.uploads);

    let notification_service = NotificationService::new(pool.clone(), telegram_service);
    let notifier: Arc<dyn Notifier> = Arc::new(notification_service.clone());

    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        sms_service,
        Arc::new(MemoryStore::new()),
        Duration::from_secs(config.otp.ttl_seconds),
    );
    let user_service = UserService::new(pool.clone());
    let agent_service = AgentService::new(pool.clone());
    let credit_service = CreditService::new(pool.clone());
    let payment_service = PaymentService::new(pool.clone(), notifier.clone());
    let product_service = ProductService::new(pool.clone());
    let subscription_service = SubscriptionService::new(pool.clone(), notifier);
    let report_service = ReportService::new(pool.clone());
    let setting_service = SettingService::new(pool.clone());

    if let (Some(mobile), Some(password)) = (
        config.bootstrap.super_admin_mobile.as_deref(),
        config.bootstrap.super_admin_password.as_deref(),
    ) {
        if let Err(e) = user_service.ensure_super_admin(mobile, password).await {
            log::error!("Failed to bootstrap super admin: {e}");
        }
    }
    if let Err(e) = setting_service.ensure_defaults().await {
        log::error!("Failed to seed default settings: {e}");
    }

    tasks::spawn_all(&config.tasks, subscription_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(agent_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(product_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .app_data(web::Data::new(setting_service.clone()))
            .app_data(web::Data::new(receipt_storage.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::api_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
