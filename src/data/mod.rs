pub mod schema;
pub mod seed;
pub mod store;

pub use seed::seed_demo;
pub use store::{default_db_path, DataStore, SqliteStore, Table};
