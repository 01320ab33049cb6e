//! Product and point-template repository contract.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub org_id: String,
}

/// Declares one field of a product's data model. Decoded event fields only
/// become shadow points when a template with a matching key exists for the
/// event's point class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Field key in the decoded payload.
    pub key: String,
    /// Display title carried onto the shadow point.
    pub title: String,
    /// Point class this template belongs to ("attributes" or "telemetry").
    pub classify: String,
    pub unit: Option<String>,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_one(&self, product_id: &str) -> Result<Option<ProductRecord>>;

    /// Templates for one product filtered by point class.
    async fn find_templates(&self, product_id: &str, classify: &str)
        -> Result<Vec<TemplateRecord>>;
}

#[async_trait]
impl<T: ProductRepository + ?Sized> ProductRepository for Arc<T> {
    async fn find_one(&self, product_id: &str) -> Result<Option<ProductRecord>> {
        (**self).find_one(product_id).await
    }

    async fn find_templates(
        &self,
        product_id: &str,
        classify: &str,
    ) -> Result<Vec<TemplateRecord>> {
        (**self).find_templates(product_id, classify).await
    }
}
