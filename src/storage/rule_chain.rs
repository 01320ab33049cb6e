//! Rule-chain repository contract.
//!
//! Chain resolution is a two-step lookup: the product binding yields a chain
//! id, and the chain id yields the JSON definition document.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait RuleChainRepository: Send + Sync {
    /// Rule-chain id bound to a product, if any.
    async fn find_chain_id(&self, product_id: &str) -> Result<Option<String>>;

    /// JSON definition document for a chain id, if any.
    async fn find_definition(&self, chain_id: &str) -> Result<Option<String>>;
}

#[async_trait]
impl<T: RuleChainRepository + ?Sized> RuleChainRepository for Arc<T> {
    async fn find_chain_id(&self, product_id: &str) -> Result<Option<String>> {
        (**self).find_chain_id(product_id).await
    }

    async fn find_definition(&self, chain_id: &str) -> Result<Option<String>> {
        (**self).find_definition(chain_id).await
    }
}
