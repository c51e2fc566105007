pub mod agent;
pub mod auth;
pub mod credit;
pub mod notification;
pub mod payment;
pub mod product;
pub mod report;
pub mod setting;
pub mod subscription;
pub mod user;

pub use agent::agent_config;
pub use auth::auth_config;
pub use credit::credit_config;
pub use notification::notification_config;
pub use payment::payment_config;
pub use product::product_config;
pub use report::report_config;
pub use setting::setting_config;
pub use subscription::subscription_config;
pub use user::user_config;

use crate::error::AppResult;
use crate::middlewares::current_user;
use crate::models::{AgentScope, CurrentUser};
use crate::services::AgentService;
use actix_web::HttpRequest;

/// Caller plus the agents whose data the request may touch.
pub(crate) async fn request_scope(
    agent_service: &AgentService,
    req: &HttpRequest,
) -> AppResult<(CurrentUser, AgentScope)> {
    let current = current_user(req)?;
    let scope = agent_service.resolve_scope(&current).await?;
    Ok((current, scope))
}

/// Mounts every API scope; wrapped in `/api/v1` by the caller.
pub fn api_config(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.configure(auth_config)
        .configure(user_config)
        .configure(agent_config)
        .configure(credit_config)
        .configure(payment_config)
        .configure(product_config)
        .configure(subscription_config)
        .configure(notification_config)
        .configure(report_config)
        .configure(setting_config);
}
