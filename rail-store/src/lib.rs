pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory;
pub mod train_repo;
pub mod user_repo;

pub use database::{DbClient, PgStore};
pub use memory::MemoryStore;
