// Analytics endpoints
//
// Read-only reports under /api/analytics. Product id filters repeat the
// `productIds` key once per id.

use crate::client::InventoryClient;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::models::{
    CostAnalysis, CostFilter, StockVelocity, SupplierPerformance, TrendFilter, TrendPoint,
    VelocityFilter,
};
use crate::query::QueryParams;

impl InventoryClient {
    /// `GET /api/analytics/velocity?period&productIds…`
    pub async fn velocity_analysis(
        &self,
        filter: &VelocityFilter,
    ) -> Result<Envelope<Vec<StockVelocity>>, Error> {
        let mut query = QueryParams::new();
        query
            .push_opt("period", filter.period)
            .push_all("productIds", &filter.product_ids);
        self.get("/api/analytics/velocity", &query).await
    }

    /// `GET /api/analytics/costs?startDate&endDate&productIds…`
    pub async fn cost_analysis(
        &self,
        filter: &CostFilter,
    ) -> Result<Envelope<Vec<CostAnalysis>>, Error> {
        let mut query = QueryParams::new();
        query
            .push_opt("startDate", filter.start_date)
            .push_opt("endDate", filter.end_date)
            .push_all("productIds", &filter.product_ids);
        self.get("/api/analytics/costs", &query).await
    }

    /// `GET /api/analytics/suppliers`
    pub async fn supplier_performance(&self) -> Result<Envelope<Vec<SupplierPerformance>>, Error> {
        self.get("/api/analytics/suppliers", &QueryParams::new()).await
    }

    /// `GET /api/analytics/trends?metric&period&startDate&endDate`
    pub async fn trends(&self, filter: &TrendFilter) -> Result<Envelope<Vec<TrendPoint>>, Error> {
        let mut query = QueryParams::new();
        query
            .push("metric", filter.metric)
            .push("period", filter.period)
            .push_opt("startDate", filter.start_date)
            .push_opt("endDate", filter.end_date);
        self.get("/api/analytics/trends", &query).await
    }
}
