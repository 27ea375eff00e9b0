//! Hand-written SQL shared by the raw-SQL and micro-ORM variants.

/// Lower bound (exclusive) on `sales_order_detail_id` for the filtered scan.
pub const FILTER_MIN_DETAIL_ID: i32 = 500;

/// Upper bound (exclusive) on `sales_order_detail_id` for the filtered scan.
pub const FILTER_MAX_DETAIL_ID: i32 = 110_000;

/// Lower bound (exclusive) on `unit_price` for the filtered scan.
pub const FILTER_MIN_UNIT_PRICE: f64 = 20.0;

/// Column list of `sales_order_detail`, in [`crate::rows::SalesOrderDetail`] field order.
pub const DETAIL_COLUMNS: &str = "sales_order_id, sales_order_detail_id, carrier_tracking_number, \
    order_qty, product_id, special_offer_id, unit_price, unit_price_discount, line_total, \
    rowguid, modified_date";

pub const GET_ALL: &str = r#"
    SELECT
        sales_order_id,
        sales_order_detail_id,
        carrier_tracking_number,
        order_qty,
        product_id,
        special_offer_id,
        unit_price,
        unit_price_discount,
        line_total,
        rowguid,
        modified_date
    FROM sales_order_detail
"#;

pub const FILTER_AND_SORT: &str = r#"
    SELECT
        sales_order_id,
        sales_order_detail_id,
        carrier_tracking_number,
        order_qty,
        product_id,
        special_offer_id,
        unit_price,
        unit_price_discount,
        line_total,
        rowguid,
        modified_date
    FROM sales_order_detail
    WHERE sales_order_detail_id > 500 AND sales_order_detail_id < 110000
        AND unit_price > 20.0
    ORDER BY product_id DESC
"#;

pub const ORDER_PRICES: &str = r#"
    SELECT sales_order_id,
        SUM(order_qty) AS total_order_qty,
        SUM(order_qty * (unit_price - unit_price_discount)) AS total_price,
        SUM(order_qty * unit_price_discount) AS total_discount
    FROM sales_order_detail AS s
    GROUP BY s.sales_order_id
"#;

pub const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sales_order_detail (
        sales_order_id INTEGER NOT NULL,
        sales_order_detail_id INTEGER PRIMARY KEY,
        carrier_tracking_number TEXT,
        order_qty INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        special_offer_id INTEGER NOT NULL,
        unit_price REAL NOT NULL,
        unit_price_discount REAL NOT NULL DEFAULT 0.0,
        line_total REAL NOT NULL,
        rowguid TEXT NOT NULL UNIQUE,
        modified_date TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sales_order_detail_order ON sales_order_detail(sales_order_id);
    CREATE INDEX IF NOT EXISTS idx_sales_order_detail_product ON sales_order_detail(product_id);
"#;

pub const INSERT_DETAIL: &str = "INSERT INTO sales_order_detail (sales_order_id, sales_order_detail_id, \
    carrier_tracking_number, order_qty, product_id, special_offer_id, unit_price, \
    unit_price_discount, line_total, rowguid, modified_date) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
