pub mod agent;
pub mod auth;
pub mod credit;
pub mod notification;
pub mod payment;
pub mod product;
pub mod report;
pub mod scope;
pub mod setting;
pub mod subscription;
pub mod user;

pub use agent::*;
pub use auth::*;
pub use credit::*;
pub use notification::*;
pub use payment::*;
pub use product::*;
pub use report::*;
pub use scope::*;
pub use setting::*;
pub use subscription::*;
pub use user::*;

pub use crate::utils::pagination::{PaginatedResponse, PaginationInfo, PaginationParams};
