//! Database layer: pool, repositories, and the store boundary for PostgreSQL.

mod pool;
mod repositories;
mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use pool::{create_pool, DbPool};
pub use repositories::*;
pub use store::{ChatStore, PgStore};
