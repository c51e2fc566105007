pub mod activity_log;
pub mod agent_service;
pub mod auth_service;
pub mod credit_service;
pub mod notification_service;
pub mod payment_service;
pub mod product_service;
pub mod report_service;
pub mod setting_service;
pub mod subscription_service;
pub mod user_service;

pub use activity_log::*;
pub use agent_service::*;
pub use auth_service::*;
pub use credit_service::*;
pub use notification_service::*;
pub use payment_service::*;
pub use product_service::*;
pub use report_service::*;
pub use setting_service::*;
pub use subscription_service::*;
pub use user_service::*;
