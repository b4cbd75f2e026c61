pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;

pub use app_config::Config;
pub use database::{DbClient, PgStore};
pub use events::EventBus;
pub use memory::MemoryStore;
