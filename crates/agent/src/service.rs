use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use bazaar_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use bazaar_core::domain::product::{NegotiableProduct, ProductId};
use bazaar_core::domain::session::SessionKey;
use bazaar_core::errors::{ApplicationError, DomainError};
use bazaar_core::negotiation::{ConcessionLadderEngine, NegotiationStrategy, Stage};
use bazaar_db::repositories::{ProductCatalog, SessionStore};

use crate::runtime::{NegotiationRuntime, TurnOutcome};

const ACTOR: &str = "negotiation-service";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcceptanceOutcome {
    Accepted { price: Decimal, currency_code: String },
    Rejected { reason: AcceptanceRejection },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceRejection {
    NoStandingOffer,
    AboveReferencePrice,
}

impl AcceptanceRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoStandingOffer => "no_standing_offer",
            Self::AboveReferencePrice => "above_reference_price",
        }
    }
}

/// Negotiation turns bound to a product catalog and a session store.
///
/// Turns on the same product are serialized, so two buyers haggling over one
/// listing never interleave their read-modify-write of the negotiated price.
pub struct NegotiationService<C, S, A = NoopAuditSink, E = ConcessionLadderEngine> {
    catalog: C,
    sessions: S,
    audit: A,
    runtime: NegotiationRuntime<E>,
    product_locks: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl<C, S, A, E> NegotiationService<C, S, A, E>
where
    C: ProductCatalog,
    S: SessionStore,
    A: AuditSink,
    E: NegotiationStrategy,
{
    pub fn new(catalog: C, sessions: S, audit: A, runtime: NegotiationRuntime<E>) -> Self {
        Self { catalog, sessions, audit, runtime, product_locks: Mutex::new(HashMap::new()) }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Runs one turn and returns the reply text.
    pub async fn negotiate(
        &self,
        product_id: &ProductId,
        session_key: &SessionKey,
        message: &str,
    ) -> Result<String, ApplicationError> {
        self.negotiate_turn(product_id, session_key, message).await.map(|outcome| outcome.reply)
    }

    /// Runs one turn under the product lock. The session (transcript and
    /// language lock) is saved before the negotiated price, so a failed price
    /// write still leaves the exchange on record.
    pub async fn negotiate_turn(
        &self,
        product_id: &ProductId,
        session_key: &SessionKey,
        message: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        let context = AuditContext::new(
            Some(product_id.clone()),
            Some(session_key.to_string()),
            correlation_id,
            ACTOR,
        );
        ensure_session_matches(product_id, session_key)?;

        let turn = self.evaluate_turn(&context, product_id, session_key, message);
        self.with_product_lock(product_id, turn).await
    }

    async fn evaluate_turn(
        &self,
        context: &AuditContext,
        product_id: &ProductId,
        session_key: &SessionKey,
        message: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        let correlation_id = &context.correlation_id;
        let product = self.load_product(product_id).await?;
        let mut session = self.sessions.load_or_new(session_key).await?;

        let outcome = match self.runtime.respond(&product, &mut session, message) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "negotiation.turn.failed",
                    correlation_id = %correlation_id,
                    product_id = %product_id,
                    error = %error,
                    "negotiation turn failed"
                );
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "negotiation.turn.failed",
                        AuditCategory::Negotiation,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        };

        self.sessions.save(session).await?;

        if let Some(price) = outcome.negotiated_price.filter(|_| outcome.price_changed) {
            if let Err(error) = self.catalog.update_negotiated_price(product_id, price).await {
                warn!(
                    event_name = "negotiation.price.persist_failed",
                    correlation_id = %correlation_id,
                    product_id = %product_id,
                    error = %error,
                    "negotiated price could not be stored"
                );
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "negotiation.price.persist_failed",
                        AuditCategory::Persistence,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        }

        info!(
            event_name = "negotiation.turn.evaluated",
            correlation_id = %correlation_id,
            product_id = %product_id,
            session_key = %session_key,
            stage = outcome.stage.key(),
            quoted_price = %outcome.quoted_price,
            price_changed = outcome.price_changed,
            language = outcome.language.code(),
            "negotiation turn evaluated"
        );
        self.audit.emit(turn_event(context, &outcome));

        Ok(outcome)
    }

    /// Accepts the standing offer. On success the buyer's session is cleared;
    /// the agreed price stays on the product for checkout.
    pub async fn accept_current_offer(
        &self,
        product_id: &ProductId,
        session_key: &SessionKey,
    ) -> Result<AcceptanceOutcome, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        let context = AuditContext::new(
            Some(product_id.clone()),
            Some(session_key.to_string()),
            correlation_id.clone(),
            ACTOR,
        );
        ensure_session_matches(product_id, session_key)?;

        let outcome = self
            .with_product_lock(product_id, self.settle_offer(product_id, session_key))
            .await?;

        let event = match &outcome {
            AcceptanceOutcome::Accepted { price, .. } => {
                info!(
                    event_name = "negotiation.accept.completed",
                    correlation_id = %correlation_id,
                    product_id = %product_id,
                    session_key = %session_key,
                    price = %price,
                    "standing offer accepted"
                );
                AuditEvent::new(
                    &context,
                    "negotiation.accept.completed",
                    AuditCategory::Acceptance,
                    AuditOutcome::Success,
                )
                .with_metadata("price", price.to_string())
            }
            AcceptanceOutcome::Rejected { reason } => {
                info!(
                    event_name = "negotiation.accept.rejected",
                    correlation_id = %correlation_id,
                    product_id = %product_id,
                    reason = reason.code(),
                    "standing offer could not be accepted"
                );
                AuditEvent::new(
                    &context,
                    "negotiation.accept.rejected",
                    AuditCategory::Acceptance,
                    AuditOutcome::Rejected,
                )
                .with_metadata("reason", reason.code())
            }
        };
        self.audit.emit(event);

        Ok(outcome)
    }

    async fn settle_offer(
        &self,
        product_id: &ProductId,
        session_key: &SessionKey,
    ) -> Result<AcceptanceOutcome, ApplicationError> {
        let product = self.load_product(product_id).await?;
        let outcome = match product.negotiated_price {
            Some(price) if price <= product.reference_price => {
                self.sessions.clear(session_key).await?;
                AcceptanceOutcome::Accepted { price, currency_code: product.currency_code }
            }
            Some(_) => AcceptanceOutcome::Rejected { reason: AcceptanceRejection::AboveReferencePrice },
            None => AcceptanceOutcome::Rejected { reason: AcceptanceRejection::NoStandingOffer },
        };
        Ok(outcome)
    }

    async fn load_product(&self, product_id: &ProductId) -> Result<NegotiableProduct, ApplicationError> {
        self.catalog
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| ApplicationError::ProductNotFound(product_id.clone()))
    }

    /// Runs `work` while holding the lock for `product_id`. The lock entry is
    /// dropped from the map once no other turn holds or awaits it.
    async fn with_product_lock<T>(&self, product_id: &ProductId, work: impl Future<Output = T>) -> T {
        let lock = {
            let mut locks = self.product_locks.lock().await;
            Arc::clone(locks.entry(product_id.clone()).or_default())
        };

        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);

        let mut locks = self.product_locks.lock().await;
        if locks.get(product_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(product_id);
        }
        result
    }
}

fn ensure_session_matches(product_id: &ProductId, session_key: &SessionKey) -> Result<(), ApplicationError> {
    if &session_key.product_id == product_id {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(format!(
            "session {session_key} does not belong to product {product_id}"
        ))
        .into())
    }
}

fn turn_event(context: &AuditContext, outcome: &TurnOutcome) -> AuditEvent {
    let (category, result) = match outcome.stage {
        Stage::NotNegotiable => (AuditCategory::Guardrail, AuditOutcome::Rejected),
        _ => (AuditCategory::Negotiation, AuditOutcome::Success),
    };

    let event = AuditEvent::new(context, "negotiation.turn.evaluated", category, result)
        .with_metadata("stage", outcome.stage.key())
        .with_metadata("quoted_price", outcome.quoted_price.to_string())
        .with_metadata("language", outcome.language.code())
        .with_metadata("previous_negotiated_price", optional_price(outcome.previous_negotiated_price))
        .with_metadata("new_negotiated_price", optional_price(outcome.negotiated_price));

    match &outcome.guardrail_reason {
        Some(reason) => event.with_metadata("guardrail_reason", reason.clone()),
        None => event,
    }
}

fn optional_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "none".to_string(), |price| price.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use bazaar_core::audit::{AuditCategory, AuditOutcome, InMemoryAuditSink};
    use bazaar_core::domain::product::{NegotiableProduct, ProductId};
    use bazaar_core::domain::session::{Language, SessionKey};
    use bazaar_core::errors::ApplicationError;
    use bazaar_db::repositories::{
        InMemoryProductCatalog, InMemorySessionStore, ProductCatalog, RepositoryError, SessionStore,
    };

    use super::{AcceptanceOutcome, AcceptanceRejection, NegotiationService};
    use crate::runtime::NegotiationRuntime;

    type Service = NegotiationService<InMemoryProductCatalog, InMemorySessionStore, InMemoryAuditSink>;

    fn kanga_id() -> ProductId {
        ProductId("kanga-set-001".to_string())
    }

    fn key(buyer: &str) -> SessionKey {
        SessionKey::new(buyer, kanga_id())
    }

    fn service_with(products: Vec<NegotiableProduct>) -> (Service, InMemoryAuditSink) {
        let audit = InMemoryAuditSink::default();
        let service = NegotiationService::new(
            InMemoryProductCatalog::with_products(products),
            InMemorySessionStore::default(),
            audit.clone(),
            NegotiationRuntime::default(),
        );
        (service, audit)
    }

    fn kanga() -> NegotiableProduct {
        NegotiableProduct::new("kanga-set-001", "Kanga set", Decimal::from(150_000), "TZS")
    }

    /// Serves reads from memory but refuses every price write.
    struct PriceWriteFailingCatalog(InMemoryProductCatalog);

    #[async_trait]
    impl ProductCatalog for PriceWriteFailingCatalog {
        async fn find_by_id(&self, id: &ProductId) -> Result<Option<NegotiableProduct>, RepositoryError> {
            self.0.find_by_id(id).await
        }

        async fn save(&self, product: NegotiableProduct) -> Result<(), RepositoryError> {
            self.0.save(product).await
        }

        async fn list(&self) -> Result<Vec<NegotiableProduct>, RepositoryError> {
            self.0.list().await
        }

        async fn update_negotiated_price(
            &self,
            _id: &ProductId,
            _value: Decimal,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Storage("catalog is read-only".to_string()))
        }
    }

    async fn negotiated_price(service: &Service) -> Option<Decimal> {
        service
            .catalog()
            .find_by_id(&kanga_id())
            .await
            .expect("find")
            .and_then(|product| product.negotiated_price)
    }

    #[tokio::test]
    async fn turn_persists_the_counter_offer() {
        let (service, audit) = service_with(vec![kanga()]);

        let reply = service
            .negotiate(&kanga_id(), &key("buyer-1"), "I want to pay 100000")
            .await
            .expect("turn");

        assert!(reply.contains("TZS 147,000"));
        assert_eq!(negotiated_price(&service).await, Some(Decimal::from(147_000)));

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, AuditCategory::Negotiation);
        assert_eq!(events[0].metadata.get("stage").map(String::as_str), Some("too_low_initial_counter"));
        assert_eq!(
            events[0].metadata.get("new_negotiated_price").map(String::as_str),
            Some("147000")
        );
    }

    #[tokio::test]
    async fn session_language_and_transcript_are_saved() {
        let (service, _) = service_with(vec![kanga()]);

        service
            .negotiate(&kanga_id(), &key("buyer-1"), "Habari rafiki, bei gani?")
            .await
            .expect("turn");

        let sessions = service.sessions();
        assert_eq!(
            sessions.language_preference(&key("buyer-1")).await.expect("language"),
            Some(Language::Swahili)
        );
        let session = sessions.find(&key("buyer-1")).await.expect("find").expect("session");
        assert_eq!(session.transcript.len(), 2);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (service, _) = service_with(vec![]);

        let error = service
            .negotiate(&kanga_id(), &key("buyer-1"), "100000")
            .await
            .expect_err("missing product");

        assert_eq!(error, ApplicationError::ProductNotFound(kanga_id()));
    }

    #[tokio::test]
    async fn session_for_another_product_is_rejected() {
        let (service, _) = service_with(vec![kanga()]);
        let foreign = SessionKey::new("buyer-1", ProductId("carved-stool-002".to_string()));

        let error = service.negotiate(&kanga_id(), &foreign, "100000").await.expect_err("mismatch");

        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[tokio::test]
    async fn fixed_price_product_is_left_untouched() {
        let (service, audit) = service_with(vec![kanga().non_negotiable()]);

        let reply = service.negotiate(&kanga_id(), &key("buyer-1"), "100000").await.expect("turn");

        assert!(reply.contains("can't be negotiated"));
        assert_eq!(negotiated_price(&service).await, None);
        assert_eq!(audit.events()[0].category, AuditCategory::Guardrail);
        assert_eq!(audit.events()[0].outcome, AuditOutcome::Rejected);
    }

    #[tokio::test]
    async fn accepting_the_standing_offer_clears_the_session() {
        let (service, audit) = service_with(vec![kanga()]);
        service.negotiate(&kanga_id(), &key("buyer-1"), "140000").await.expect("turn");

        let outcome = service.accept_current_offer(&kanga_id(), &key("buyer-1")).await.expect("accept");

        assert_eq!(
            outcome,
            AcceptanceOutcome::Accepted { price: Decimal::from(140_000), currency_code: "TZS".to_string() }
        );
        assert_eq!(service.sessions().find(&key("buyer-1")).await.expect("find"), None);
        assert_eq!(negotiated_price(&service).await, Some(Decimal::from(140_000)));
        assert!(audit
            .events()
            .iter()
            .any(|event| event.event_type == "negotiation.accept.completed"));
    }

    #[tokio::test]
    async fn accepting_without_an_offer_is_rejected() {
        let (service, _) = service_with(vec![kanga()]);

        let outcome = service.accept_current_offer(&kanga_id(), &key("buyer-1")).await.expect("accept");

        assert_eq!(
            outcome,
            AcceptanceOutcome::Rejected { reason: AcceptanceRejection::NoStandingOffer }
        );
    }

    #[tokio::test]
    async fn corrupt_offer_above_reference_is_not_accepted() {
        let (service, _) =
            service_with(vec![kanga().with_negotiated_price(Decimal::from(160_000))]);

        let outcome = service.accept_current_offer(&kanga_id(), &key("buyer-1")).await.expect("accept");

        assert_eq!(
            outcome,
            AcceptanceOutcome::Rejected { reason: AcceptanceRejection::AboveReferencePrice }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_buyers_walk_one_shared_ladder() {
        let (service, _) = service_with(vec![kanga()]);
        let service = Arc::new(service);

        let tasks = (0..8)
            .map(|buyer| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .negotiate(&kanga_id(), &key(&format!("buyer-{buyer}")), "lower please")
                        .await
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            task.await.expect("join").expect("turn");
        }

        assert_eq!(negotiated_price(&service).await, Some(Decimal::from(135_000)));
    }

    #[tokio::test]
    async fn failed_price_write_keeps_the_session_on_record() {
        let audit = InMemoryAuditSink::default();
        let service = NegotiationService::new(
            PriceWriteFailingCatalog(InMemoryProductCatalog::with_products(vec![kanga()])),
            InMemorySessionStore::default(),
            audit.clone(),
            NegotiationRuntime::default(),
        );

        let error = service
            .negotiate(&kanga_id(), &key("buyer-1"), "Habari rafiki, nataka kulipa 100000")
            .await
            .expect_err("price write fails");

        assert_eq!(error, ApplicationError::Persistence("catalog is read-only".to_string()));
        let session = service.sessions().find(&key("buyer-1")).await.expect("find").expect("session");
        assert_eq!(session.language, Some(Language::Swahili));
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(audit.events()[0].event_type, "negotiation.price.persist_failed");
        assert_eq!(audit.events()[0].category, AuditCategory::Persistence);
    }

    #[tokio::test]
    async fn product_locks_are_released_after_each_turn() {
        let (service, _) = service_with(vec![kanga()]);

        service.negotiate(&kanga_id(), &key("buyer-1"), "lower please").await.expect("turn");
        service.accept_current_offer(&kanga_id(), &key("buyer-1")).await.expect("accept");
        let missing = ProductId("missing-999".to_string());
        let result = service.negotiate(&missing, &SessionKey::new("buyer-1", missing.clone()), "hi").await;
        assert!(result.is_err());

        assert!(service.product_locks.lock().await.is_empty());
    }
}
