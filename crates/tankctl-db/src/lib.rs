//! Database layer for the tank control server.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The three quantity logs (`waterlevel`,
//! `valveposition`, `triggerthreshold`) are created through versioned
//! migrations managed by this crate.
//!
//! Table and column names match the schema used by the sensor relay and
//! the PLC logic client, so all of them can share one database file.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
