//! In-memory repository implementations.
//!
//! Back the binary's default wiring and the test suite. All of them record
//! enough state to be inspected after the fact.

use super::device::DeviceRepository;
use super::event_log::{ConnectionEvent, EventLog};
use super::product::{ProductRecord, ProductRepository, TemplateRecord};
use super::rule_chain::RuleChainRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryDeviceRepository {
    statuses: Mutex<HashMap<String, String>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn status(&self, device_id: &str) -> Option<String> {
        let statuses = self.statuses.lock().await;
        statuses.get(device_id).cloned()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn update_status(&self, device_id: &str, status: &str) -> Result<()> {
        let mut statuses = self.statuses.lock().await;
        statuses.insert(device_id.to_string(), status.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<HashMap<String, ProductRecord>>,
    templates: Mutex<HashMap<String, Vec<TemplateRecord>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: ProductRecord) {
        let mut products = self.products.lock().await;
        products.insert(product.id.clone(), product);
    }

    pub async fn insert_template(&self, product_id: &str, template: TemplateRecord) {
        let mut templates = self.templates.lock().await;
        templates
            .entry(product_id.to_string())
            .or_default()
            .push(template);
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_one(&self, product_id: &str) -> Result<Option<ProductRecord>> {
        let products = self.products.lock().await;
        Ok(products.get(product_id).cloned())
    }

    async fn find_templates(
        &self,
        product_id: &str,
        classify: &str,
    ) -> Result<Vec<TemplateRecord>> {
        let templates = self.templates.lock().await;
        Ok(templates
            .get(product_id)
            .map(|list| {
                list.iter()
                    .filter(|t| t.classify == classify)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryRuleChainRepository {
    bindings: Mutex<HashMap<String, String>>,
    definitions: Mutex<HashMap<String, String>>,
}

impl InMemoryRuleChainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a product to a chain and store the chain's definition document.
    pub async fn insert_chain(&self, product_id: &str, chain_id: &str, definition: &str) {
        let mut bindings = self.bindings.lock().await;
        bindings.insert(product_id.to_string(), chain_id.to_string());
        let mut definitions = self.definitions.lock().await;
        definitions.insert(chain_id.to_string(), definition.to_string());
    }
}

#[async_trait]
impl RuleChainRepository for InMemoryRuleChainRepository {
    async fn find_chain_id(&self, product_id: &str) -> Result<Option<String>> {
        let bindings = self.bindings.lock().await;
        Ok(bindings.get(product_id).cloned())
    }

    async fn find_definition(&self, chain_id: &str) -> Result<Option<String>> {
        let definitions = self.definitions.lock().await;
        Ok(definitions.get(chain_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ConnectionEvent> {
        let events = self.events.lock().await;
        events.clone()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn insert_event(&self, event: ConnectionEvent) -> Result<()> {
        let mut events = self.events.lock().await;
        events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_template_filtering_by_classify() {
        let repo = InMemoryProductRepository::new();
        repo.insert_template(
            "p1",
            TemplateRecord {
                key: "temp".to_string(),
                title: "Temperature".to_string(),
                classify: "telemetry".to_string(),
                unit: Some("C".to_string()),
            },
        )
        .await;
        repo.insert_template(
            "p1",
            TemplateRecord {
                key: "fw".to_string(),
                title: "Firmware".to_string(),
                classify: "attributes".to_string(),
                unit: None,
            },
        )
        .await;

        let telemetry = repo.find_templates("p1", "telemetry").await.unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].key, "temp");

        let attributes = repo.find_templates("p1", "attributes").await.unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].key, "fw");
    }

    #[tokio::test]
    async fn test_chain_lookup_round_trip() {
        let repo = InMemoryRuleChainRepository::new();
        repo.insert_chain("p1", "chain-1", "{\"nodes\":[],\"edges\":[]}")
            .await;

        let chain_id = repo.find_chain_id("p1").await.unwrap().unwrap();
        assert_eq!(chain_id, "chain-1");
        assert!(repo.find_definition(&chain_id).await.unwrap().is_some());
        assert!(repo.find_chain_id("p2").await.unwrap().is_none());
    }
}
