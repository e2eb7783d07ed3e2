//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod postgres;

pub use connection::{create_pool, run_migrations, MIGRATOR};
pub use postgres::pg_repositories;
