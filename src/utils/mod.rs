pub mod code_generator;
pub mod jwt;
pub mod kv_store;
pub mod mobile;
pub mod pagination;
pub mod password;

pub use code_generator::generate_six_digit_code;
pub use jwt::*;
pub use kv_store::{ExpiringStore, MemoryStore};
pub use mobile::normalize_mobile;
pub use pagination::*;
pub use password::*;
