// Product catalog endpoints
//
// CRUD over /api/products. List results are paginated.

use reqwest::Method;
use tracing::debug;

use crate::client::{InventoryClient, path_segment};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::models::{NewProduct, Page, Product, ProductFilter, ProductUpdate};
use crate::query::QueryParams;

impl InventoryClient {
    /// List products matching `filter`.
    ///
    /// `GET /api/products?page&limit&category&status&search`
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Envelope<Page<Product>>, Error> {
        let mut query = QueryParams::new();
        query
            .push_opt("page", filter.page)
            .push_opt("limit", filter.limit)
            .push_opt("category", filter.category.as_deref())
            .push_opt("status", filter.status)
            .push_opt("search", filter.search.as_deref());
        self.get("/api/products", &query).await
    }

    /// `GET /api/products/{id}`
    pub async fn get_product(&self, id: &str) -> Result<Envelope<Product>, Error> {
        let endpoint = format!("/api/products/{}", path_segment(id));
        self.get(&endpoint, &QueryParams::new()).await
    }

    /// `POST /api/products`
    pub async fn create_product(&self, product: &NewProduct) -> Result<Envelope<Product>, Error> {
        debug!(sku = %product.sku, "creating product");
        self.send_json(Method::POST, "/api/products", product).await
    }

    /// `PUT /api/products/{id}`
    pub async fn update_product(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<Envelope<Product>, Error> {
        let endpoint = format!("/api/products/{}", path_segment(id));
        debug!(id, "updating product");
        self.send_json(Method::PUT, &endpoint, update).await
    }

    /// `DELETE /api/products/{id}`
    ///
    /// The service may answer with the deleted product, a message, or an
    /// empty body, so the payload stays untyped.
    pub async fn delete_product(&self, id: &str) -> Result<Envelope<serde_json::Value>, Error> {
        let endpoint = format!("/api/products/{}", path_segment(id));
        debug!(id, "deleting product");
        self.request(Method::DELETE, &endpoint, &QueryParams::new(), None)
            .await
    }
}
