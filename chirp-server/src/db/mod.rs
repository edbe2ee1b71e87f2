pub mod columns;
pub mod connection;
pub mod repositories;
pub mod schema;
pub mod store;

pub use connection::{Database, DbConnection, DbPool};
pub use store::SqliteStore;
