// Inventory service wire types
//
// Field names are camelCase on the wire. Optional fields tolerate absence so
// older deployments of the service decode cleanly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Products ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl ProductStatus {
    /// Derive the status from stock levels.
    pub fn for_stock(stock: u32, min_stock: u32) -> Self {
        if stock == 0 {
            Self::OutOfStock
        } else if stock <= min_stock {
            Self::LowStock
        } else {
            Self::InStock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub sku: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub min_stock: u32,
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Product {
    /// Stock value at list price.
    pub fn stock_value(&self) -> f64 {
        self.price * f64::from(self.stock)
    }
}

/// Body for `POST /api/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub sku: String,
    pub price: f64,
    pub stock: u32,
    pub min_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

/// Body for `PUT /api/products/{id}`. Only the fields set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Filters for `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
}

// ── Pagination ──────────────────────────────────────────────────────

/// Paginated list as returned by the list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    /// A single page holding every item.
    pub fn single(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            data,
            total: u64::try_from(len).unwrap_or(u64::MAX),
            page: 1,
            limit: u32::try_from(len).unwrap_or(u32::MAX),
            has_next: false,
            has_prev: false,
        }
    }
}

// ── Stock movements ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum MovementType {
    In,
    Out,
    Adjustment,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed: outbound movements are negative.
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_stock: Option<i64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body for `POST /api/inventory/movements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockMovement {
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Filters for `GET /api/inventory/movements`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ── Alerts & stats ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
    /// Any severity this client does not know about.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    /// `LOW_STOCK`, `OUT_OF_STOCK`, ...
    #[serde(rename = "type", default)]
    pub alert_type: String,
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default)]
    pub threshold: i64,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub acknowledged: bool,
}

impl StockAlert {
    pub fn is_critical(&self) -> bool {
        self.severity == AlertSeverity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_products: u64,
    pub total_value: f64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    #[serde(default)]
    pub top_products: Vec<Product>,
}

impl InventoryStats {
    /// Number of products listed in `top_products`.
    pub const TOP_PRODUCTS: usize = 5;

    /// Compute stats from a product list.
    ///
    /// Value is the sum of price times stock. Top products are the first
    /// five in list order.
    pub fn from_products(products: &[Product]) -> Self {
        let count = |status: ProductStatus| {
            products.iter().filter(|p| p.status == status).count() as u64
        };

        Self {
            total_products: products.len() as u64,
            total_value: products.iter().map(Product::stock_value).sum(),
            low_stock_count: count(ProductStatus::LowStock),
            out_of_stock_count: count(ProductStatus::OutOfStock),
            top_products: products.iter().take(Self::TOP_PRODUCTS).cloned().collect(),
        }
    }
}

impl Default for InventoryStats {
    fn default() -> Self {
        Self::from_products(&[])
    }
}

// ── Analytics ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VelocityPeriod {
    Week,
    Month,
    Quarter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VelocityFilter {
    pub period: Option<VelocityPeriod>,
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VelocityClass {
    Fast,
    Medium,
    Slow,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockVelocity {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub average_daily_usage: f64,
    #[serde(default)]
    pub average_weekly_usage: f64,
    #[serde(default)]
    pub average_monthly_usage: f64,
    pub velocity: VelocityClass,
    #[serde(default)]
    pub days_of_supply: f64,
    #[serde(default)]
    pub reorder_point: u32,
    #[serde(default)]
    pub total_movements: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAnalysis {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub average_cost: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub profit_margin: f64,
    #[serde(default)]
    pub turnover_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPerformance {
    pub supplier_id: String,
    pub supplier_name: String,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub on_time_deliveries: u32,
    #[serde(default)]
    pub on_time_percentage: f64,
    #[serde(default)]
    pub average_lead_time: f64,
    #[serde(default)]
    pub quality_rating: f64,
    #[serde(default)]
    pub total_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendMetric {
    Sales,
    Stock,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendPeriod {
    Daily,
    Weekly,
    Monthly,
}

/// Filters for `GET /api/analytics/trends`. Metric and period are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendFilter {
    pub metric: TrendMetric,
    pub period: TrendPeriod,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One point of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    #[serde(alias = "period")]
    pub date: String,
    pub value: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn product(id: &str, price: f64, stock: u32, min_stock: u32) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            category: "Networking".into(),
            sku: id.to_uppercase(),
            price,
            stock,
            min_stock,
            status: ProductStatus::for_stock(stock, min_stock),
            description: None,
            image: None,
            location: None,
            supplier: None,
            last_updated: None,
        }
    }

    #[test]
    fn stats_from_products() {
        let products: Vec<Product> = (0..7)
            .map(|i| product(&format!("p{i}"), 10.0, i, 2))
            .collect();
        let stats = InventoryStats::from_products(&products);

        assert_eq!(stats.total_products, 7);
        // 10 * (0 + 1 + ... + 6)
        assert!((stats.total_value - 210.0).abs() < f64::EPSILON);
        assert_eq!(stats.out_of_stock_count, 1);
        assert_eq!(stats.low_stock_count, 2);
        assert_eq!(stats.top_products.len(), 5);
        assert_eq!(stats.top_products[0].id, "p0");
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = InventoryStats::default();
        assert_eq!(stats.total_products, 0);
        assert!(stats.top_products.is_empty());
    }

    #[test]
    fn unknown_severity_is_not_critical() {
        let alert: StockAlert = serde_json::from_value(json!({
            "id": "a1",
            "productId": "p1",
            "productName": "Splitter",
            "severity": "critical"
        }))
        .unwrap();
        assert_eq!(alert.severity, AlertSeverity::Unknown);
        assert!(!alert.is_critical());
    }

    #[test]
    fn movement_type_wire_format() {
        let body = serde_json::to_value(NewStockMovement {
            product_id: "prod-001".into(),
            movement_type: MovementType::Transfer,
            quantity: 20,
            reason: "Inter-warehouse Transfer".into(),
            location: "Warehouse A".into(),
            reference: None,
            notes: None,
        })
        .unwrap();
        assert_eq!(body["type"], "TRANSFER");
        assert_eq!(body["productId"], "prod-001");
        assert!(body.get("notes").is_none());
        assert_eq!("out".parse::<MovementType>().unwrap(), MovementType::Out);
    }

    #[test]
    fn update_serializes_only_set_fields() {
        let update = ProductUpdate {
            stock: Some(12),
            ..ProductUpdate::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "stock": 12 }));
        assert!(ProductUpdate::default().is_empty());
    }

    #[test]
    fn page_defaults_missing_flags() {
        let page: Page<u32> = serde_json::from_value(json!({ "data": [1, 2] })).unwrap();
        assert_eq!(page.page, 1);
        assert!(!page.has_next);
    }
}
