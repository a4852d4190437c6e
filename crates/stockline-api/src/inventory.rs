// Inventory endpoints
//
// Aggregate stats, stock movements and low-stock alerts under
// /api/inventory.

use reqwest::Method;
use tracing::debug;

use crate::client::InventoryClient;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::models::{
    InventoryStats, MovementFilter, NewStockMovement, Page, StockAlert, StockMovement,
};
use crate::query::QueryParams;

impl InventoryClient {
    /// `GET /api/inventory/stats`
    pub async fn inventory_stats(&self) -> Result<Envelope<InventoryStats>, Error> {
        self.get("/api/inventory/stats", &QueryParams::new()).await
    }

    /// List stock movements matching `filter`.
    ///
    /// `GET /api/inventory/movements?productId&type&startDate&endDate&page&limit`
    pub async fn list_stock_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Envelope<Page<StockMovement>>, Error> {
        let mut query = QueryParams::new();
        query
            .push_opt("productId", filter.product_id.as_deref())
            .push_opt("type", filter.movement_type)
            .push_opt("startDate", filter.start_date)
            .push_opt("endDate", filter.end_date)
            .push_opt("page", filter.page)
            .push_opt("limit", filter.limit);
        self.get("/api/inventory/movements", &query).await
    }

    /// `POST /api/inventory/movements`
    pub async fn record_stock_movement(
        &self,
        movement: &NewStockMovement,
    ) -> Result<Envelope<StockMovement>, Error> {
        debug!(
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "recording stock movement"
        );
        self.send_json(Method::POST, "/api/inventory/movements", movement)
            .await
    }

    /// `GET /api/inventory/alerts`
    pub async fn stock_alerts(&self) -> Result<Envelope<Vec<StockAlert>>, Error> {
        self.get("/api/inventory/alerts", &QueryParams::new()).await
    }
}
