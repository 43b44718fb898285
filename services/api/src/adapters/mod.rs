pub mod db;
pub mod file_store;

pub use db::PgStore;
pub use file_store::FileStore;
