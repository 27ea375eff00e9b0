//! Micro-ORM backend on rusqlite.
//!
//! Every query opens a fresh read-only connection, runs hand-written SQL and
//! maps rows with a closure, then closes the connection.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Row};

use crate::error::BackendError;
use crate::rows::{OrderPrice, SalesOrderDetail};
use crate::sql;

/// rusqlite backend for benchmarks.
#[derive(Debug, Clone)]
pub struct MicroBackend {
    path: PathBuf,
}

impl MicroBackend {
    /// Create a backend for the database at `path`, checking that it opens.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let backend = Self { path: path.into() };
        backend.connect()?;
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, BackendError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Every row of `sales_order_detail`.
    pub fn get_all(&self) -> Result<Vec<SalesOrderDetail>, BackendError> {
        self.query(sql::GET_ALL, map_detail)
    }

    /// Filtered rows ordered by product descending.
    pub fn filter_and_sort(&self) -> Result<Vec<SalesOrderDetail>, BackendError> {
        self.query(sql::FILTER_AND_SORT, map_detail)
    }

    /// Price totals grouped by order.
    pub fn order_prices(&self) -> Result<Vec<OrderPrice>, BackendError> {
        self.query(sql::ORDER_PRICES, map_order_price)
    }

    fn query<T, F>(&self, sql: &str, map: F) -> Result<Vec<T>, BackendError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_detail(row: &Row<'_>) -> rusqlite::Result<SalesOrderDetail> {
    Ok(SalesOrderDetail {
        sales_order_id: row.get(0)?,
        sales_order_detail_id: row.get(1)?,
        carrier_tracking_number: row.get(2)?,
        order_qty: row.get(3)?,
        product_id: row.get(4)?,
        special_offer_id: row.get(5)?,
        unit_price: row.get(6)?,
        unit_price_discount: row.get(7)?,
        line_total: row.get(8)?,
        rowguid: row.get(9)?,
        modified_date: row.get(10)?,
    })
}

fn map_order_price(row: &Row<'_>) -> rusqlite::Result<OrderPrice> {
    Ok(OrderPrice {
        sales_order_id: row.get(0)?,
        total_order_qty: row.get(1)?,
        total_price: row.get(2)?,
        total_discount: row.get(3)?,
    })
}
