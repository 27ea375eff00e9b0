//! Sales-order workload for querybench.
//!
//! Compares an ORM-style data-access stack (sqlx with pooled contexts, a
//! query builder and optional change tracking) against a micro-ORM style
//! (rusqlite with hand-written SQL and a fresh connection per query) on the
//! same SQLite database.
//!
//! # Scenarios
//!
//! - **get_all**: every row of `sales_order_detail`
//! - **filter_and_sort**: id and price range filter, ordered by product
//! - **order_prices**: per-order totals via `GROUP BY`

pub mod backends;
pub mod error;
pub mod fixtures;
pub mod rows;
pub mod scenarios;
pub mod sql;

pub use backends::{MicroBackend, OrmBackend, OrmMode, DEFAULT_POOL_SIZE};
pub use error::BackendError;
pub use fixtures::{generate_details, seed, seed_scale, Scale, SeedSummary};
pub use rows::{OrderPrice, SalesOrderDetail};
pub use scenarios::{parse_database_url, SalesScenario, SalesWorkload};
