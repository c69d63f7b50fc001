use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use bazaar_core::config::AppConfig;
use bazaar_core::domain::product::NegotiableProduct;
use bazaar_core::domain::session::{Language, NegotiationSession, TranscriptEntry};
use bazaar_core::errors::DomainError;
use bazaar_core::negotiation::templates::{render, ReplyContext};
use bazaar_core::negotiation::{
    BuyerInput, ConcessionLadderEngine, NegotiationState, NegotiationStrategy, Stage,
};

use crate::conversation::OfferInterpreter;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};

/// Everything one turn produced. `negotiated_price` is the value the product
/// record holds after the turn; `price_changed` says whether it moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub stage: Stage,
    pub language: Language,
    pub input: BuyerInput,
    pub quoted_price: Decimal,
    pub previous_negotiated_price: Option<Decimal>,
    pub negotiated_price: Option<Decimal>,
    pub price_changed: bool,
    pub guardrail_reason: Option<String>,
}

/// Runs a single negotiation turn without touching any storage.
#[derive(Clone, Debug)]
pub struct NegotiationRuntime<E = ConcessionLadderEngine> {
    interpreter: OfferInterpreter,
    engine: E,
    guardrails: GuardrailPolicy,
}

impl Default for NegotiationRuntime<ConcessionLadderEngine> {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl NegotiationRuntime<ConcessionLadderEngine> {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            OfferInterpreter::new(config.interpreter.clone(), config.language.clone()),
            ConcessionLadderEngine::new(config.negotiation.clone()),
            GuardrailPolicy,
        )
    }
}

impl<E: NegotiationStrategy> NegotiationRuntime<E> {
    pub fn new(interpreter: OfferInterpreter, engine: E, guardrails: GuardrailPolicy) -> Self {
        Self { interpreter, engine, guardrails }
    }

    /// Locks the session language on first contact, interprets `message`,
    /// decides the counter-offer and renders the reply. Both sides of the
    /// exchange are appended to the session transcript.
    pub fn respond(
        &self,
        product: &NegotiableProduct,
        session: &mut NegotiationSession,
        message: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let language = match session.language {
            Some(language) => language,
            None => session.lock_language(self.interpreter.detect_language(message)),
        };
        session.record(TranscriptEntry::buyer(message));

        let guardrail = self.guardrails.evaluate(product);
        let input = match &guardrail {
            GuardrailDecision::Allow => {
                self.interpreter.interpret(message, product.reference_price, language)
            }
            GuardrailDecision::Deny { reason_code, error, fallback_stage } => {
                debug!(
                    event_name = "negotiation.guardrail.denied",
                    product_id = %product.id,
                    reason_code = *reason_code,
                    error = %error,
                    "turn refused by guardrail"
                );
                let reply = reply_for(*fallback_stage, product, product.reference_price, None, language);
                session.record(TranscriptEntry::agent(reply.clone()));

                return Ok(TurnOutcome {
                    reply,
                    stage: *fallback_stage,
                    language,
                    input: BuyerInput::Unparseable,
                    quoted_price: product.reference_price,
                    previous_negotiated_price: product.negotiated_price,
                    negotiated_price: product.negotiated_price,
                    price_changed: false,
                    guardrail_reason: guardrail.reason_code().map(str::to_string),
                });
            }
        };

        let decision = self.engine.decide(&NegotiationState::from(product), &input)?;
        let echo = match &input {
            BuyerInput::ExplicitOffer { echo, .. } => Some(echo.as_str()),
            BuyerInput::SoftRequest | BuyerInput::Unparseable => None,
        };
        let reply = reply_for(decision.stage, product, decision.quoted_price, echo, language);

        debug!(
            event_name = "negotiation.turn.decided",
            product_id = %product.id,
            stage = decision.stage.key(),
            quoted_price = %decision.quoted_price,
            language = language.code(),
            "turn decided"
        );
        session.record(TranscriptEntry::agent(reply.clone()));

        Ok(TurnOutcome {
            reply,
            stage: decision.stage,
            language,
            input,
            quoted_price: decision.quoted_price,
            previous_negotiated_price: product.negotiated_price,
            negotiated_price: decision.negotiated_price.or(product.negotiated_price),
            price_changed: decision.changes_price(),
            guardrail_reason: None,
        })
    }
}

fn reply_for(
    stage: Stage,
    product: &NegotiableProduct,
    price: Decimal,
    offer_echo: Option<&str>,
    language: Language,
) -> String {
    let context = ReplyContext { price, currency_code: &product.currency_code, offer_echo };
    render(stage, &context, language)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use bazaar_core::config::AppConfig;
    use bazaar_core::domain::product::{NegotiableProduct, ProductId};
    use bazaar_core::domain::session::{Language, NegotiationSession, SessionKey, Speaker};
    use bazaar_core::negotiation::{BuyerInput, RoundingMode, Stage};

    use super::{NegotiationRuntime, TurnOutcome};

    fn kanga() -> NegotiableProduct {
        NegotiableProduct::new("kanga-set-001", "Kanga set", Decimal::from(150_000), "TZS")
    }

    fn session() -> NegotiationSession {
        NegotiationSession::new(SessionKey::new("buyer-1", ProductId("kanga-set-001".to_string())))
    }

    fn turn(product: &mut NegotiableProduct, session: &mut NegotiationSession, message: &str) -> TurnOutcome {
        let outcome = NegotiationRuntime::from_config(&AppConfig::default())
            .respond(product, session, message)
            .expect("turn should succeed");
        product.negotiated_price = outcome.negotiated_price;
        outcome
    }

    #[test]
    fn low_opening_offer_gets_the_first_concession() {
        let mut product = kanga();
        let mut session = session();

        let outcome = turn(&mut product, &mut session, "I want to pay 100000");

        assert_eq!(outcome.stage, Stage::TooLowInitialCounter);
        assert_eq!(outcome.quoted_price, Decimal::from(147_000));
        assert_eq!(outcome.negotiated_price, Some(Decimal::from(147_000)));
        assert!(outcome.price_changed);
        assert_eq!(outcome.language, Language::English);
        assert_eq!(
            outcome.reply,
            "100000 is too low for this item. To get us started, I can do TZS 147,000."
        );
    }

    #[test]
    fn soft_request_after_opening_moves_to_the_mid_rung() {
        let mut product = kanga().with_negotiated_price(Decimal::from(147_000));
        let mut session = session();

        let outcome = turn(&mut product, &mut session, "still too much, lower please");

        assert_eq!(outcome.input, BuyerInput::SoftRequest);
        assert_eq!(outcome.stage, Stage::StageTwoOffer);
        assert_eq!(outcome.quoted_price, Decimal::from(143_000));
    }

    #[test]
    fn half_even_rounding_is_configurable() {
        let mut config = AppConfig::default();
        config.negotiation.rounding = RoundingMode::HalfEven;
        let runtime = NegotiationRuntime::from_config(&config);
        let product = kanga().with_negotiated_price(Decimal::from(147_000));

        let outcome =
            runtime.respond(&product, &mut session(), "lower please").expect("turn should succeed");

        assert_eq!(outcome.quoted_price, Decimal::from(142_000));
    }

    #[test]
    fn gibberish_holds_the_price() {
        let mut product = kanga().with_negotiated_price(Decimal::from(143_000));
        let mut session = session();

        let outcome = turn(&mut product, &mut session, "asdkjaskd");

        assert_eq!(outcome.stage, Stage::DefaultQuery);
        assert!(!outcome.price_changed);
        assert_eq!(outcome.negotiated_price, Some(Decimal::from(143_000)));
    }

    #[test]
    fn first_message_locks_the_language_for_the_session() {
        let mut product = kanga();
        let mut session = session();

        let first = turn(&mut product, &mut session, "Habari rafiki, tafadhali punguza bei");
        assert_eq!(first.language, Language::Swahili);
        assert_eq!(first.stage, Stage::StageOneOffer);
        assert_eq!(first.reply, "Kwa ajili yako, naweza kushusha hadi TZS 147,000.");

        let second = turn(&mut product, &mut session, "ok 140000");
        assert_eq!(second.language, Language::Swahili);
        assert_eq!(session.language, Some(Language::Swahili));
    }

    #[test]
    fn long_messages_are_still_read_for_offers() {
        let mut product = kanga();
        let mut session = session();
        let message = format!("{} ok, I can pay 140000", "so ".repeat(600));

        let outcome = turn(&mut product, &mut session, &message);

        assert_eq!(
            outcome.input,
            BuyerInput::ExplicitOffer { amount: Decimal::from(140_000), echo: "140000".to_string() }
        );
        assert_eq!(outcome.stage, Stage::Accept);
        assert_eq!(outcome.guardrail_reason, None);
    }

    #[test]
    fn transcript_records_both_sides() {
        let mut product = kanga();
        let mut session = session();

        turn(&mut product, &mut session, "150k");

        let speakers = session.transcript.iter().map(|entry| entry.speaker).collect::<Vec<_>>();
        assert_eq!(speakers, vec![Speaker::Buyer, Speaker::Agent]);
        assert_eq!(session.transcript[0].text, "150k");
    }

    #[test]
    fn fixed_price_product_gets_the_rejection_reply() {
        let mut product = kanga().non_negotiable();
        let mut session = session();

        let outcome = turn(&mut product, &mut session, "100000");

        assert_eq!(outcome.stage, Stage::NotNegotiable);
        assert_eq!(outcome.negotiated_price, None);
        assert!(!outcome.price_changed);
        assert_eq!(outcome.guardrail_reason.as_deref(), Some("product_not_negotiable"));
        assert_eq!(outcome.reply, "Sorry, the price of this item is fixed and can't be negotiated.");
    }

    #[test]
    fn listings_near_the_decimal_limit_render_their_counter() {
        let reference = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
        let product = NegotiableProduct::new("yacht-001", "Yacht", reference, "TZS");

        let outcome = NegotiationRuntime::from_config(&AppConfig::default())
            .respond(&product, &mut session(), "lower please")
            .expect("turn should succeed");

        assert_eq!(outcome.stage, Stage::StageOneOffer);
        assert_eq!(
            outcome.reply,
            "For you, I can bring it down to TZS 9,800,000,000,000,000,000,000,000,000."
        );
    }

    #[test]
    fn full_ladder_walk_never_raises_the_price() {
        let mut product = kanga();
        let mut session = session();
        let messages = ["100000", "lower please", "reduce", "discount?", "best price", "120000"];

        let mut previous = product.reference_price;
        for message in messages {
            let outcome = turn(&mut product, &mut session, message);
            let current = outcome.negotiated_price.unwrap_or(product.reference_price);
            assert!(current <= previous, "{message} raised the price to {current}");
            assert!(current >= Decimal::from(135_000));
            previous = current;
        }

        assert_eq!(product.negotiated_price, Some(Decimal::from(135_000)));
    }
}
