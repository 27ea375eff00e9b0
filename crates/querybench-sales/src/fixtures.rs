//! Test data generation for benchmarks.
//!
//! Produces a deterministic `sales_order_detail` table so that runs on
//! different machines measure the same data.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};

use crate::error::BackendError;
use crate::rows::SalesOrderDetail;
use crate::sql;

/// Seed for the row generator.
const SEED: u64 = 43659;

/// First sales order id, as in the reference sales database.
const FIRST_SALES_ORDER_ID: i32 = 43659;

/// Discounts applied to generated lines (most lines carry none).
const DISCOUNTS: [f64; 7] = [0.0, 0.0, 0.0, 0.02, 0.05, 0.10, 0.15];

/// Scale factor for generated data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    /// 1,000 rows.
    Tiny,
    /// 10,000 rows.
    Small,
    /// 50,000 rows.
    Medium,
    /// 121,317 rows, the size of the reference sales table.
    Full,
}

impl Scale {
    /// Number of detail rows for this scale.
    pub fn rows(&self) -> usize {
        match self {
            Scale::Tiny => 1_000,
            Scale::Small => 10_000,
            Scale::Medium => 50_000,
            Scale::Full => 121_317,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Small
    }
}

impl std::str::FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tiny" => Ok(Scale::Tiny),
            "small" => Ok(Scale::Small),
            "medium" => Ok(Scale::Medium),
            "full" => Ok(Scale::Full),
            other => Err(format!("unknown scale: {}", other)),
        }
    }
}

/// What [`seed`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub rows: usize,
    pub orders: usize,
}

/// Generate `count` detail rows with ids `1..=count`.
///
/// Orders hold between one and five lines each.
pub fn generate_details(count: usize) -> Vec<SalesOrderDetail> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let base_date = NaiveDate::from_ymd_opt(2011, 5, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut details = Vec::with_capacity(count);
    let mut order_id = FIRST_SALES_ORDER_ID;
    let mut lines_left: u32 = rng.gen_range(1..=5);
    let mut tracking_number: Option<String> = None;

    for i in 0..count {
        if lines_left == 0 {
            order_id += 1;
            lines_left = rng.gen_range(1..=5);
            tracking_number = None;
        }
        if tracking_number.is_none() && rng.gen_bool(0.5) {
            tracking_number = Some(format!(
                "{:04X}-{:03X}C-{:02X}",
                rng.gen_range(0..0x10000u32),
                rng.gen_range(0..0x1000u32),
                rng.gen_range(0..0x100u32)
            ));
        }
        lines_left -= 1;

        let order_qty: i32 = rng.gen_range(1..=10);
        let unit_price = rng.gen_range(100..=357_827) as f64 / 100.0;
        let unit_price_discount = DISCOUNTS[rng.gen_range(0..DISCOUNTS.len())];
        let line_total =
            (order_qty as f64 * unit_price * (1.0 - unit_price_discount) * 10_000.0).round()
                / 10_000.0;
        let rowguid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        let modified_date = base_date + Duration::days(((order_id - FIRST_SALES_ORDER_ID) / 40) as i64);

        details.push(SalesOrderDetail {
            sales_order_id: order_id,
            sales_order_detail_id: (i + 1) as i32,
            carrier_tracking_number: tracking_number.clone(),
            order_qty,
            product_id: rng.gen_range(707..=999),
            special_offer_id: if unit_price_discount > 0.0 { rng.gen_range(2..=16) } else { 1 },
            unit_price,
            unit_price_discount,
            line_total,
            rowguid: rowguid.to_string().to_uppercase(),
            modified_date: modified_date.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        });
    }

    details
}

/// Create the schema at `path` (creating the file if needed) and insert
/// `count` generated rows in one transaction. Existing rows are replaced.
pub fn seed(path: &Path, count: usize) -> Result<SeedSummary, BackendError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(sql::CREATE_SCHEMA)?;

    let details = generate_details(count);
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM sales_order_detail", [])?;
    {
        let mut stmt = tx.prepare(sql::INSERT_DETAIL)?;
        for d in &details {
            stmt.execute(params![
                d.sales_order_id,
                d.sales_order_detail_id,
                d.carrier_tracking_number,
                d.order_qty,
                d.product_id,
                d.special_offer_id,
                d.unit_price,
                d.unit_price_discount,
                d.line_total,
                d.rowguid,
                d.modified_date,
            ])?;
        }
    }
    tx.commit()?;

    let orders = match (details.first(), details.last()) {
        (Some(first), Some(last)) => (last.sales_order_id - first.sales_order_id + 1) as usize,
        _ => 0,
    };

    tracing::info!(path = %path.display(), rows = details.len(), orders, "seeded sales database");

    Ok(SeedSummary {
        rows: details.len(),
        orders,
    })
}

/// Seed a database at the given scale.
pub fn seed_scale(path: &Path, scale: Scale) -> Result<SeedSummary, BackendError> {
    seed(path, scale.rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_details(50);
        let b = generate_details(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_rows_are_well_formed() {
        let details = generate_details(500);
        assert_eq!(details.len(), 500);
        assert_eq!(details[0].sales_order_detail_id, 1);
        assert_eq!(details[499].sales_order_detail_id, 500);
        assert_eq!(details[0].sales_order_id, FIRST_SALES_ORDER_ID);

        for pair in details.windows(2) {
            let step = pair[1].sales_order_id - pair[0].sales_order_id;
            assert!(step == 0 || step == 1);
        }
        for d in &details {
            assert!((1..=10).contains(&d.order_qty));
            assert!(d.unit_price >= 1.0);
            assert!(d.line_total <= d.order_qty as f64 * d.unit_price + 1e-9);
            assert_eq!(d.rowguid.len(), 36);
        }
    }

    #[test]
    fn test_seed_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");

        let summary = seed(&path, 300).unwrap();
        assert_eq!(summary.rows, 300);
        assert!(summary.orders >= 60 && summary.orders <= 300);

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sales_order_detail", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 300);

        // Re-seeding replaces rather than duplicates.
        seed(&path, 100).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sales_order_detail", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 100);
    }

    #[test]
    fn test_scale_parse() {
        assert_eq!("Full".parse::<Scale>().unwrap().rows(), 121_317);
        assert!("huge".parse::<Scale>().is_err());
    }
}
