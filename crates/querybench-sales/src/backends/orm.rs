//! ORM-style backend on sqlx.
//!
//! Queries go through a [`SalesContext`] acquired from a pooled factory, the
//! way a full ORM hands out a unit-of-work per request. Entity queries are
//! composed with [`DetailQuery`] and mapped with `FromRow`. Tracking queries
//! attach every returned entity to the context's [`ChangeTracker`], keeping an
//! original snapshot for change detection. Raw-SQL queries bypass the query
//! builder but still run through a context.
//!
//! sqlx is async; the backend owns a current-thread tokio runtime and blocks
//! on it so callers stay synchronous. Dropping a pooled connection only
//! spawns the task that returns it, and on a current-thread runtime that task
//! runs whenever the runtime is next driven. Every operation therefore ends
//! with [`SalesContext::release`], which drives the runtime until the
//! connection is idle again, so each call acquires and releases inside its
//! own `block_on`.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, QueryBuilder};
use tokio::runtime::Runtime;

use crate::error::BackendError;
use crate::rows::{OrderPrice, SalesOrderDetail};
use crate::sql;

/// Default size of the context pool.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// How the ORM backend executes a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrmMode {
    /// Composed query; returned entities are tracked.
    Tracking,
    /// Composed query; nothing is tracked.
    NoTracking,
    /// Hand-written SQL mapped with `FromRow`.
    RawSql,
}

impl OrmMode {
    pub const ALL: [OrmMode; 3] = [OrmMode::Tracking, OrmMode::NoTracking, OrmMode::RawSql];

    /// Flag attached to the variant label.
    pub fn flag(&self) -> &'static str {
        match self {
            OrmMode::Tracking => "tracking",
            OrmMode::NoTracking => "no_tracking",
            OrmMode::RawSql => "raw_sql",
        }
    }
}

// -----------------------------------------------------------------------------
// Change tracking
// -----------------------------------------------------------------------------

/// An entity with a primary key.
pub trait Entity: Clone + PartialEq {
    type Key: Hash + Eq + Copy;

    fn key(&self) -> Self::Key;
}

impl Entity for SalesOrderDetail {
    type Key = i32;

    fn key(&self) -> i32 {
        self.sales_order_detail_id
    }
}

/// Identity map holding the original snapshot of every attached entity.
#[derive(Debug)]
pub struct ChangeTracker<E: Entity> {
    snapshots: HashMap<E::Key, E>,
}

impl<E: Entity> ChangeTracker<E> {
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
        }
    }

    /// Attach an entity. Returns false when an entity with the same key is
    /// already tracked; the first snapshot wins.
    pub fn attach(&mut self, entity: &E) -> bool {
        match self.snapshots.entry(entity.key()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                true
            }
        }
    }

    /// Attach every entity of a result set.
    pub fn attach_all(&mut self, entities: &[E]) {
        self.snapshots.reserve(entities.len());
        for entity in entities {
            self.attach(entity);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<E: Entity> Default for ChangeTracker<E> {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Query composition
// -----------------------------------------------------------------------------

/// Filterable and sortable columns of `sales_order_detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailColumn {
    SalesOrderId,
    SalesOrderDetailId,
    ProductId,
    UnitPrice,
}

impl DetailColumn {
    fn as_sql(&self) -> &'static str {
        match self {
            DetailColumn::SalesOrderId => "sales_order_id",
            DetailColumn::SalesOrderDetailId => "sales_order_detail_id",
            DetailColumn::ProductId => "product_id",
            DetailColumn::UnitPrice => "unit_price",
        }
    }
}

/// Bound value of a predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Real(f64),
}

/// A comparison on one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    GreaterThan(DetailColumn, SqlValue),
    LessThan(DetailColumn, SqlValue),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A composed query over `sales_order_detail` entities.
///
/// Tracking is on by default, as in a full ORM.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailQuery {
    predicates: Vec<Predicate>,
    order_by: Option<(DetailColumn, Direction)>,
    tracking: bool,
}

impl DetailQuery {
    /// All entities, tracked.
    pub fn all() -> Self {
        Self {
            predicates: Vec::new(),
            order_by: None,
            tracking: true,
        }
    }

    /// Add a predicate; predicates are combined with AND.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, column: DetailColumn) -> Self {
        self.order_by = Some((column, Direction::Ascending));
        self
    }

    pub fn order_by_descending(mut self, column: DetailColumn) -> Self {
        self.order_by = Some((column, Direction::Descending));
        self
    }

    /// Do not attach results to the context's change tracker.
    pub fn as_no_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Build the SQL with bound parameters.
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {} FROM sales_order_detail", sql::DETAIL_COLUMNS));

        for (i, predicate) in self.predicates.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            let (column, op, value) = match predicate {
                Predicate::GreaterThan(column, value) => (column, " > ", value),
                Predicate::LessThan(column, value) => (column, " < ", value),
            };
            builder.push(column.as_sql()).push(op);
            match *value {
                SqlValue::Int(v) => builder.push_bind(v),
                SqlValue::Real(v) => builder.push_bind(v),
            };
        }

        if let Some((column, direction)) = self.order_by {
            builder.push(" ORDER BY ").push(column.as_sql());
            builder.push(match direction {
                Direction::Ascending => " ASC",
                Direction::Descending => " DESC",
            });
        }

        builder
    }
}

/// The filtered scan: `500 < id < 110000 AND unit_price > 20`, newest product first.
pub fn filter_and_sort_query() -> DetailQuery {
    DetailQuery::all()
        .filter(Predicate::GreaterThan(
            DetailColumn::SalesOrderDetailId,
            SqlValue::Int(sql::FILTER_MIN_DETAIL_ID as i64),
        ))
        .filter(Predicate::LessThan(
            DetailColumn::SalesOrderDetailId,
            SqlValue::Int(sql::FILTER_MAX_DETAIL_ID as i64),
        ))
        .filter(Predicate::GreaterThan(
            DetailColumn::UnitPrice,
            SqlValue::Real(sql::FILTER_MIN_UNIT_PRICE),
        ))
        .order_by_descending(DetailColumn::ProductId)
}

/// Grouped projection into [`OrderPrice`].
fn order_prices_query() -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder
        .push(DetailColumn::SalesOrderId.as_sql())
        .push(", SUM(order_qty) AS total_order_qty")
        .push(", SUM(order_qty * (unit_price - unit_price_discount)) AS total_price")
        .push(", SUM(order_qty * unit_price_discount) AS total_discount")
        .push(" FROM sales_order_detail GROUP BY ")
        .push(DetailColumn::SalesOrderId.as_sql());
    builder
}

// -----------------------------------------------------------------------------
// Context
// -----------------------------------------------------------------------------

/// Unit of work bound to one pooled connection.
pub struct SalesContext {
    conn: PoolConnection<Sqlite>,
    pool: SqlitePool,
    tracker: ChangeTracker<SalesOrderDetail>,
}

impl SalesContext {
    /// Acquire a context from the pool.
    pub async fn acquire(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conn: pool.acquire().await?,
            pool: pool.clone(),
            tracker: ChangeTracker::new(),
        })
    }

    /// Return the connection to the pool and wait until it is idle.
    ///
    /// Nothing else holds connections from a backend's pool, so the release is
    /// complete once every open connection is idle.
    pub async fn release(self) {
        let SalesContext { conn, pool, tracker } = self;
        drop(tracker);
        drop(conn);
        wait_idle(&pool).await;
    }

    /// Execute a composed entity query.
    pub async fn sales_order_details(
        &mut self,
        query: &DetailQuery,
    ) -> Result<Vec<SalesOrderDetail>, sqlx::Error> {
        let mut builder = query.build();
        let rows: Vec<SalesOrderDetail> = builder
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await?;

        if query.is_tracking() {
            self.tracker.attach_all(&rows);
        }
        Ok(rows)
    }

    /// Execute the grouped order-price projection. Projections are never tracked.
    pub async fn order_prices(&mut self) -> Result<Vec<OrderPrice>, sqlx::Error> {
        let mut builder = order_prices_query();
        let rows = builder.build_query_as().fetch_all(&mut *self.conn).await?;
        Ok(rows)
    }

    /// Execute hand-written SQL and map rows with `FromRow`.
    pub async fn sql_query<T>(&mut self, sql: &str) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        sqlx::query_as::<_, T>(sql).fetch_all(&mut *self.conn).await
    }

    pub fn tracker(&self) -> &ChangeTracker<SalesOrderDetail> {
        &self.tracker
    }
}

/// Drive the runtime until every open connection of `pool` is idle.
async fn wait_idle(pool: &SqlitePool) {
    while !pool.is_closed() && pool.num_idle() < pool.size() as usize {
        tokio::task::yield_now().await;
    }
}

// -----------------------------------------------------------------------------
// Backend
// -----------------------------------------------------------------------------

/// sqlx backend for benchmarks.
pub struct OrmBackend {
    pool: SqlitePool,
    rt: Runtime,
}

impl OrmBackend {
    /// Open a read-only pool on the database at `path`.
    ///
    /// Establishes one connection up front so an unreachable database is
    /// reported here rather than during measurement.
    pub fn connect(path: &Path, pool_size: u32) -> Result<Self, BackendError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = rt.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(pool_size.max(1))
                .connect_with(options)
                .await?;
            wait_idle(&pool).await;
            Ok::<_, sqlx::Error>(pool)
        })?;

        Ok(Self { pool, rt })
    }

    /// Every row of `sales_order_detail`.
    pub fn get_all(&self, mode: OrmMode) -> Result<Vec<SalesOrderDetail>, BackendError> {
        self.details(mode, DetailQuery::all(), sql::GET_ALL)
    }

    /// Filtered rows ordered by product descending.
    pub fn filter_and_sort(&self, mode: OrmMode) -> Result<Vec<SalesOrderDetail>, BackendError> {
        self.details(mode, filter_and_sort_query(), sql::FILTER_AND_SORT)
    }

    /// Price totals grouped by order.
    pub fn order_prices(&self, mode: OrmMode) -> Result<Vec<OrderPrice>, BackendError> {
        let rows = self.rt.block_on(async {
            let mut ctx = SalesContext::acquire(&self.pool).await?;
            let rows = match mode {
                OrmMode::RawSql => ctx.sql_query::<OrderPrice>(sql::ORDER_PRICES).await,
                OrmMode::Tracking | OrmMode::NoTracking => ctx.order_prices().await,
            };
            ctx.release().await;
            rows
        })?;
        Ok(rows)
    }

    /// Run an entity query in a fresh context and return the entities together
    /// with the number of entities the context ended up tracking.
    pub fn details_tracked(
        &self,
        query: &DetailQuery,
    ) -> Result<(Vec<SalesOrderDetail>, usize), BackendError> {
        let result = self.rt.block_on(async {
            let mut ctx = SalesContext::acquire(&self.pool).await?;
            let rows = ctx.sales_order_details(query).await;
            let tracked = ctx.tracker().len();
            ctx.release().await;
            Ok::<_, sqlx::Error>((rows?, tracked))
        })?;
        Ok(result)
    }

    fn details(
        &self,
        mode: OrmMode,
        query: DetailQuery,
        raw_sql: &str,
    ) -> Result<Vec<SalesOrderDetail>, BackendError> {
        let rows = self.rt.block_on(async {
            let mut ctx = SalesContext::acquire(&self.pool).await?;
            let rows = match mode {
                OrmMode::Tracking => ctx.sales_order_details(&query).await,
                OrmMode::NoTracking => ctx.sales_order_details(&query.as_no_tracking()).await,
                OrmMode::RawSql => ctx.sql_query::<SalesOrderDetail>(raw_sql).await,
            };
            ctx.release().await;
            rows
        })?;
        Ok(rows)
    }
}

impl Drop for OrmBackend {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        self.rt.block_on(async move { pool.close().await });
    }
}
