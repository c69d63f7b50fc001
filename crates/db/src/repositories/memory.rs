use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use bazaar_core::domain::product::{NegotiableProduct, ProductId};
use bazaar_core::domain::session::{NegotiationSession, SessionKey};

use super::{ProductCatalog, RepositoryError, SessionStore};

#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<BTreeMap<ProductId, NegotiableProduct>>,
}

impl InMemoryProductCatalog {
    pub fn with_products(products: impl IntoIterator<Item = NegotiableProduct>) -> Self {
        let products = products.into_iter().map(|product| (product.id.clone(), product)).collect();
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<NegotiableProduct>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn save(&self, product: NegotiableProduct) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<NegotiableProduct>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn update_negotiated_price(
        &self,
        id: &ProductId,
        value: Decimal,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let product =
            products.get_mut(id).ok_or_else(|| RepositoryError::ProductNotFound(id.clone()))?;
        product.negotiated_price = Some(value);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, NegotiationSession>>,
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find(&self, key: &SessionKey) -> Result<Option<NegotiationSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(key).cloned())
    }

    async fn save(&self, session: NegotiationSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.key.clone(), session);
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(key);
        Ok(())
    }
}
