//! Row types shared by both backends.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use querybench_core::RowDigest;

/// One line of a sales order (`sales_order_detail` table).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SalesOrderDetail {
    pub sales_order_id: i32,
    pub sales_order_detail_id: i32,
    pub carrier_tracking_number: Option<String>,
    pub order_qty: i32,
    pub product_id: i32,
    pub special_offer_id: i32,
    pub unit_price: f64,
    pub unit_price_discount: f64,
    pub line_total: f64,
    pub rowguid: String,
    pub modified_date: String,
}

/// Per-order price totals (projection of `sales_order_detail`).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderPrice {
    pub sales_order_id: i32,
    pub total_order_qty: i64,
    pub total_price: f64,
    pub total_discount: f64,
}

impl RowDigest for SalesOrderDetail {
    fn row_digest(&self) -> u64 {
        // Stored values are read back bit-for-bit by both drivers.
        let mut hasher = DefaultHasher::new();
        self.sales_order_id.hash(&mut hasher);
        self.sales_order_detail_id.hash(&mut hasher);
        self.carrier_tracking_number.hash(&mut hasher);
        self.order_qty.hash(&mut hasher);
        self.product_id.hash(&mut hasher);
        self.special_offer_id.hash(&mut hasher);
        self.unit_price.to_bits().hash(&mut hasher);
        self.unit_price_discount.to_bits().hash(&mut hasher);
        self.line_total.to_bits().hash(&mut hasher);
        self.rowguid.hash(&mut hasher);
        self.modified_date.hash(&mut hasher);
        hasher.finish()
    }
}

impl RowDigest for OrderPrice {
    fn row_digest(&self) -> u64 {
        // Sums are computed per query, so compare at a fixed precision.
        let mut hasher = DefaultHasher::new();
        self.sales_order_id.hash(&mut hasher);
        self.total_order_qty.hash(&mut hasher);
        fixed_point(self.total_price).hash(&mut hasher);
        fixed_point(self.total_discount).hash(&mut hasher);
        hasher.finish()
    }
}

fn fixed_point(value: f64) -> i64 {
    (value * 10_000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(total_price: f64) -> OrderPrice {
        OrderPrice {
            sales_order_id: 43659,
            total_order_qty: 26,
            total_price,
            total_discount: 0.0,
        }
    }

    #[test]
    fn test_order_price_digest_tolerates_rounding_noise() {
        assert_eq!(price(20565.62).row_digest(), price(20565.620000000003).row_digest());
        assert_ne!(price(20565.62).row_digest(), price(20565.63).row_digest());
    }
}
