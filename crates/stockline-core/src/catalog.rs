// ── Bundled catalog ──
//
// Static inventory shipped with the binary. Local producers draw from it
// when the service is unconfigured or unreachable.

use chrono::{DateTime, TimeZone, Utc};

use stockline_api::models::{
    AlertSeverity, InventoryStats, MovementType, Product, ProductStatus, StockAlert, StockMovement,
};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single()
}

struct ProductRow {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    sku: &'static str,
    price: f64,
    stock: u32,
    min_stock: u32,
    location: &'static str,
    supplier: &'static str,
}

const PRODUCTS: &[ProductRow] = &[
    ProductRow {
        id: "prod-001",
        name: "Router WiFi TP-Link AC1200",
        category: "Router",
        sku: "TL-AC1200",
        price: 450_000.0,
        stock: 60,
        min_stock: 20,
        location: "Warehouse A",
        supplier: "PT. Distributor Telkom",
    },
    ProductRow {
        id: "prod-002",
        name: "Modem Indihome ZTE F609",
        category: "Modem",
        sku: "ZTE-F609",
        price: 350_000.0,
        stock: 115,
        min_stock: 30,
        location: "Warehouse B",
        supplier: "PT. Distributor Telkom",
    },
    ProductRow {
        id: "prod-003",
        name: "Set Top Box Telkom TV",
        category: "Set Top Box",
        sku: "STB-TV-001",
        price: 550_000.0,
        stock: 50,
        min_stock: 15,
        location: "Warehouse A",
        supplier: "CV. Teknologi Nusantara",
    },
    ProductRow {
        id: "prod-004",
        name: "Kabel UTP Cat6",
        category: "Cable",
        sku: "UTP-CAT6",
        price: 1_250_000.0,
        stock: 15,
        min_stock: 20,
        location: "Warehouse B",
        supplier: "CV. Teknologi Nusantara",
    },
    ProductRow {
        id: "prod-005",
        name: "Splitter Fiber Optic 1:8",
        category: "Fiber Optic",
        sku: "SPL-FO-8",
        price: 85_000.0,
        stock: 0,
        min_stock: 10,
        location: "Warehouse A",
        supplier: "PT. Fiber Optik Indonesia",
    },
    ProductRow {
        id: "prod-006",
        name: "Access Point Indoor",
        category: "Access Point",
        sku: "AP-IN-001",
        price: 1_100_000.0,
        stock: 8,
        min_stock: 15,
        location: "Warehouse A",
        supplier: "PT. Distributor Telkom",
    },
    ProductRow {
        id: "prod-007",
        name: "ONT Huawei HG8245H",
        category: "Modem",
        sku: "HW-HG8245H",
        price: 400_000.0,
        stock: 72,
        min_stock: 25,
        location: "Warehouse B",
        supplier: "PT. Fiber Optik Indonesia",
    },
    ProductRow {
        id: "prod-008",
        name: "Switch 24 Port Gigabit",
        category: "Switch",
        sku: "SW-24G",
        price: 2_750_000.0,
        stock: 12,
        min_stock: 5,
        location: "Warehouse A",
        supplier: "CV. Teknologi Nusantara",
    },
    ProductRow {
        id: "prod-009",
        name: "Patch Cord FO SC-UPC 3m",
        category: "Fiber Optic",
        sku: "PC-SC-3M",
        price: 25_000.0,
        stock: 240,
        min_stock: 50,
        location: "Warehouse B",
        supplier: "PT. Fiber Optik Indonesia",
    },
    ProductRow {
        id: "prod-010",
        name: "Mesh WiFi Deco M4",
        category: "Router",
        sku: "DECO-M4",
        price: 1_450_000.0,
        stock: 4,
        min_stock: 6,
        location: "Warehouse A",
        supplier: "PT. Distributor Telkom",
    },
];

/// Every bundled product.
pub fn products() -> Vec<Product> {
    PRODUCTS
        .iter()
        .map(|row| Product {
            id: row.id.into(),
            name: row.name.into(),
            category: row.category.into(),
            sku: row.sku.into(),
            price: row.price,
            stock: row.stock,
            min_stock: row.min_stock,
            status: ProductStatus::for_stock(row.stock, row.min_stock),
            description: None,
            image: None,
            location: Some(row.location.into()),
            supplier: Some(row.supplier.into()),
            last_updated: at(2024, 1, 20, 8, 0),
        })
        .collect()
}

/// Stats over the bundled products.
pub fn inventory_stats() -> InventoryStats {
    InventoryStats::from_products(&products())
}

#[allow(clippy::too_many_arguments)]
fn movement(
    id: &str,
    product_id: &str,
    product_name: &str,
    movement_type: MovementType,
    quantity: i64,
    (previous, new): (i64, i64),
    reason: &str,
    reference: Option<&str>,
    timestamp: Option<DateTime<Utc>>,
) -> StockMovement {
    StockMovement {
        id: id.into(),
        product_id: product_id.into(),
        product_name: Some(product_name.into()),
        product_code: None,
        movement_type,
        quantity,
        previous_stock: Some(previous),
        new_stock: Some(new),
        reason: reason.into(),
        reference: reference.map(Into::into),
        location: Some("Warehouse A".into()),
        warehouse: Some("Jakarta Pusat".into()),
        user_name: Some("Admin Gudang".into()),
        timestamp,
        cost: None,
        notes: None,
    }
}

/// Recent bundled stock movements, oldest first.
pub fn stock_movements() -> Vec<StockMovement> {
    vec![
        movement(
            "mov-001",
            "prod-001",
            "Router WiFi TP-Link AC1200",
            MovementType::In,
            50,
            (25, 75),
            "Purchase Order Received",
            Some("PO-2024-001"),
            at(2024, 1, 15, 10, 30),
        ),
        movement(
            "mov-002",
            "prod-001",
            "Router WiFi TP-Link AC1200",
            MovementType::Out,
            -15,
            (75, 60),
            "Installation Order",
            Some("INS-2024-045"),
            at(2024, 1, 16, 14, 15),
        ),
        movement(
            "mov-003",
            "prod-002",
            "Modem Indihome ZTE F609",
            MovementType::Adjustment,
            -5,
            (120, 115),
            "Stock Count Correction",
            None,
            at(2024, 1, 17, 9, 0),
        ),
        movement(
            "mov-004",
            "prod-003",
            "Set Top Box Telkom TV",
            MovementType::Transfer,
            20,
            (30, 50),
            "Inter-warehouse Transfer",
            Some("TR-2024-012"),
            at(2024, 1, 18, 11, 45),
        ),
    ]
}

/// Open bundled stock alerts.
pub fn stock_alerts() -> Vec<StockAlert> {
    let alert = |id: &str, product: &ProductRow, alert_type: &str, severity, message: &str| {
        StockAlert {
            id: id.into(),
            product_id: product.id.into(),
            product_name: product.name.into(),
            product_code: Some(product.sku.into()),
            alert_type: alert_type.into(),
            current_stock: i64::from(product.stock),
            threshold: i64::from(product.min_stock),
            severity,
            message: message.into(),
            timestamp: at(2024, 1, 20, 8, 30),
            acknowledged: false,
        }
    };

    let by_id = |id: &str| PRODUCTS.iter().find(|p| p.id == id);

    [
        (
            "alert-001",
            "prod-004",
            "LOW_STOCK",
            AlertSeverity::Medium,
            "Kabel UTP Cat6 below minimum stock",
        ),
        (
            "alert-002",
            "prod-005",
            "OUT_OF_STOCK",
            AlertSeverity::Critical,
            "Splitter Fiber Optic 1:8 is out of stock",
        ),
        (
            "alert-003",
            "prod-006",
            "LOW_STOCK",
            AlertSeverity::High,
            "Access Point Indoor stock is very low",
        ),
    ]
    .into_iter()
    .filter_map(|(id, product_id, alert_type, severity, message)| {
        by_id(product_id).map(|p| alert(id, p, alert_type, severity, message))
    })
    .collect()
}
