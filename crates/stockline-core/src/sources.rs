// ── Ready-made source descriptors ──
//
// Each pairs a bundled-catalog producer with the matching remote call.
// List endpoints are paginated remotely; only the first page is adopted.

use stockline_api::models::{
    InventoryStats, MovementFilter, Product, ProductFilter, StockAlert, StockMovement,
};

use crate::catalog;
use crate::source::SourceDescriptor;

pub fn products() -> SourceDescriptor<Vec<Product>> {
    SourceDescriptor::new("products", catalog::products)
        .with_remote(|client| async move {
            let page = client.list_products(&ProductFilter::default()).await?;
            Ok::<_, stockline_api::Error>(page.map(|p| p.data))
        })
        .with_auto_refresh(true)
}

pub fn stock_movements() -> SourceDescriptor<Vec<StockMovement>> {
    SourceDescriptor::new("stock movements", catalog::stock_movements)
        .with_remote(|client| async move {
            let page = client.list_stock_movements(&MovementFilter::default()).await?;
            Ok::<_, stockline_api::Error>(page.map(|p| p.data))
        })
        .with_auto_refresh(true)
}

pub fn inventory_stats() -> SourceDescriptor<InventoryStats> {
    SourceDescriptor::new("inventory stats", catalog::inventory_stats)
        .with_remote(|client| async move { client.inventory_stats().await })
        .with_auto_refresh(true)
}

pub fn stock_alerts() -> SourceDescriptor<Vec<StockAlert>> {
    SourceDescriptor::new("stock alerts", catalog::stock_alerts)
        .with_remote(|client| async move { client.stock_alerts().await })
        .with_auto_refresh(true)
}
