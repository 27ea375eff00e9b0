//! Database access libraries under comparison.

pub mod micro;
pub mod orm;

pub use micro::MicroBackend;
pub use orm::{
    filter_and_sort_query, ChangeTracker, DetailColumn, DetailQuery, Direction, Entity,
    OrmBackend, OrmMode, Predicate, SalesContext, SqlValue, DEFAULT_POOL_SIZE,
};
