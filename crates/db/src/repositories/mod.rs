use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use bazaar_core::domain::product::{NegotiableProduct, ProductId};
use bazaar_core::domain::session::{Language, NegotiationSession, SessionKey, TranscriptEntry};
use bazaar_core::errors::ApplicationError;

pub mod memory;

pub use memory::{InMemoryProductCatalog, InMemorySessionStore};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ProductNotFound(product_id) => Self::ProductNotFound(product_id),
            RepositoryError::Storage(message) => Self::Persistence(message),
        }
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<NegotiableProduct>, RepositoryError>;

    async fn save(&self, product: NegotiableProduct) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<NegotiableProduct>, RepositoryError>;

    /// Overwrites the negotiated price; the reference price is never touched.
    async fn update_negotiated_price(
        &self,
        id: &ProductId,
        value: Decimal,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find(&self, key: &SessionKey) -> Result<Option<NegotiationSession>, RepositoryError>;

    async fn save(&self, session: NegotiationSession) -> Result<(), RepositoryError>;

    async fn clear(&self, key: &SessionKey) -> Result<(), RepositoryError>;

    async fn load_or_new(&self, key: &SessionKey) -> Result<NegotiationSession, RepositoryError> {
        Ok(self.find(key).await?.unwrap_or_else(|| NegotiationSession::new(key.clone())))
    }

    async fn language_preference(
        &self,
        key: &SessionKey,
    ) -> Result<Option<Language>, RepositoryError> {
        Ok(self.find(key).await?.and_then(|session| session.language))
    }

    async fn set_language_preference(
        &self,
        key: &SessionKey,
        language: Language,
    ) -> Result<(), RepositoryError> {
        let mut session = self.load_or_new(key).await?;
        session.language = Some(language);
        self.save(session).await
    }

    async fn append_transcript(
        &self,
        key: &SessionKey,
        entry: TranscriptEntry,
    ) -> Result<(), RepositoryError> {
        let mut session = self.load_or_new(key).await?;
        session.record(entry);
        self.save(session).await
    }
}
