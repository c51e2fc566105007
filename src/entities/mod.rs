pub mod activity_logs;
pub mod agent_group_members;
pub mod agent_groups;
pub mod agents;
pub mod credits;
pub mod notifications;
pub mod payments;
pub mod product_groups;
pub mod products;
pub mod settings;
pub mod subscriptions;
pub mod transactions;
pub mod users;

pub use activity_logs as activity_log_entity;
pub use agent_group_members as agent_group_member_entity;
pub use agent_groups as agent_group_entity;
pub use agents as agent_entity;
pub use credits as credit_entity;
pub use notifications as notification_entity;
pub use payments as payment_entity;
pub use product_groups as product_group_entity;
pub use products as product_entity;
pub use settings as setting_entity;
pub use subscriptions as subscription_entity;
pub use transactions as transaction_entity;
pub use users as user_entity;

pub use notifications::NotificationType;
pub use payments::{PaymentMethod, PaymentStatus};
pub use products::{DurationType, ProductType};
pub use subscriptions::SubscriptionStatus;
pub use transactions::TransactionType;
pub use users::UserRole;

use sea_orm::ActiveEnum;
use sea_orm::sea_query::{Expr, SimpleExpr};

/// Enum literal for `update_many` column expressions, cast to the Postgres
/// enum type the way sea-orm does for active models.
pub fn enum_expr<E>(value: E) -> SimpleExpr
where
    E: ActiveEnum,
    E::Value: Into<sea_orm::Value>,
{
    Expr::val(value.to_value()).as_enum(E::name())
}
