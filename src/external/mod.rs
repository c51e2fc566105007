pub mod sms;
pub mod storage;
pub mod telegram;

pub use sms::*;
pub use storage::*;
pub use telegram::*;
