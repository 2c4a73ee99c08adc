pub mod category;
pub mod core_api;
pub mod guard;
pub mod inventory;

pub use category::ItemCategory;
pub use core_api::{CoreError, CoreErrorCode, Engine, Session};
