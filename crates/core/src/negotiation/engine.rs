use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::NegotiableProduct;
use crate::errors::DomainError;
use crate::negotiation::ladder::{ConcessionPolicy, PriceLadder, Rung};
use crate::negotiation::Stage;

/// What the buyer's message amounted to after interpretation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuyerInput {
    /// A concrete amount; `echo` is the token as the buyer typed it.
    ExplicitOffer { amount: Decimal, echo: String },
    SoftRequest,
    Unparseable,
}

/// The slice of product state a turn depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegotiationState {
    pub reference_price: Decimal,
    pub negotiated_price: Option<Decimal>,
}

impl NegotiationState {
    pub fn last_agent_offer(&self) -> Decimal {
        self.negotiated_price.unwrap_or(self.reference_price).min(self.reference_price)
    }
}

impl From<&NegotiableProduct> for NegotiationState {
    fn from(product: &NegotiableProduct) -> Self {
        Self {
            reference_price: product.reference_price,
            negotiated_price: product.negotiated_price,
        }
    }
}

/// Result of one turn. `negotiated_price` is `Some` only when the product
/// record must be overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub stage: Stage,
    pub quoted_price: Decimal,
    pub negotiated_price: Option<Decimal>,
}

impl Decision {
    fn moved(stage: Stage, price: Decimal) -> Self {
        Self { stage, quoted_price: price, negotiated_price: Some(price) }
    }

    fn hold(stage: Stage, price: Decimal) -> Self {
        Self { stage, quoted_price: price, negotiated_price: None }
    }

    pub fn changes_price(&self) -> bool {
        self.negotiated_price.is_some()
    }
}

pub trait NegotiationStrategy: Send + Sync {
    fn decide(
        &self,
        state: &NegotiationState,
        input: &BuyerInput,
    ) -> Result<Decision, DomainError>;
}

/// Four-rung concession ladder: 100% -> 98% -> 95% -> 90% of the reference
/// price, one rung per turn, never below the floor.
#[derive(Clone, Debug, Default)]
pub struct ConcessionLadderEngine {
    policy: ConcessionPolicy,
}

impl ConcessionLadderEngine {
    pub fn new(policy: ConcessionPolicy) -> Self {
        Self { policy }
    }

    pub fn ladder(&self, reference_price: Decimal) -> Result<PriceLadder, DomainError> {
        PriceLadder::for_reference(reference_price, &self.policy)
    }

    fn explicit_offer(
        &self,
        ladder: &PriceLadder,
        state: &NegotiationState,
        offer: Decimal,
    ) -> Decision {
        let reference_price = ladder.reference_price();
        let last = state.last_agent_offer();

        if let Some(agreed) = state.negotiated_price.filter(|price| ladder.is_settled(*price)) {
            return Decision::hold(Stage::AlreadyAgreed, agreed);
        }

        if offer < ladder.engagement_floor() {
            return if ladder.has_not_conceded(last) {
                Decision::moved(Stage::TooLowInitialCounter, ladder.opening().min(last))
            } else {
                Decision::hold(Stage::FinalFloorRejection, last)
            };
        }

        if offer >= reference_price {
            return Decision::moved(Stage::TooHighOffer, reference_price);
        }

        if offer >= ladder.floor() {
            let accepted = ladder.round(offer.min(reference_price)).min(last).max(ladder.floor());
            return Decision::moved(Stage::Accept, accepted);
        }

        match ladder.next_rung(last) {
            Some(rung) => Decision::moved(counter_stage(rung), ladder.price_of(rung)),
            None => Decision::hold(Stage::FinalFloorRejection, last),
        }
    }

    fn soft_request(&self, ladder: &PriceLadder, state: &NegotiationState) -> Decision {
        let last = state.last_agent_offer();
        match ladder.next_rung(last) {
            Some(rung) => Decision::moved(soft_stage(rung), ladder.price_of(rung)),
            None => Decision::hold(Stage::FinalFloorRejection, last),
        }
    }
}

impl NegotiationStrategy for ConcessionLadderEngine {
    fn decide(
        &self,
        state: &NegotiationState,
        input: &BuyerInput,
    ) -> Result<Decision, DomainError> {
        let ladder = self.ladder(state.reference_price)?;

        let decision = match input {
            BuyerInput::ExplicitOffer { amount, .. } => {
                self.explicit_offer(&ladder, state, *amount)
            }
            BuyerInput::SoftRequest => self.soft_request(&ladder, state),
            BuyerInput::Unparseable => {
                Decision::hold(Stage::DefaultQuery, state.last_agent_offer())
            }
        };

        if let Some(price) = decision.negotiated_price {
            if price < ladder.floor() {
                return Err(DomainError::InvariantViolation(format!(
                    "negotiated price {price} is below floor {}",
                    ladder.floor()
                )));
            }
        }

        Ok(decision)
    }
}

fn counter_stage(rung: Rung) -> Stage {
    match rung {
        Rung::Opening => Stage::InitialAskCounter,
        Rung::Mid => Stage::MidAskCounter,
        Rung::Floor => Stage::FinalAskCounter,
    }
}

fn soft_stage(rung: Rung) -> Stage {
    match rung {
        Rung::Opening => Stage::StageOneOffer,
        Rung::Mid => Stage::StageTwoOffer,
        Rung::Floor => Stage::FinalOffer,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{BuyerInput, ConcessionLadderEngine, Decision, NegotiationState, NegotiationStrategy};
    use crate::negotiation::ladder::{ConcessionPolicy, RoundingMode};
    use crate::negotiation::Stage;

    fn offer(amount: i64) -> BuyerInput {
        BuyerInput::ExplicitOffer { amount: Decimal::from(amount), echo: amount.to_string() }
    }

    fn state(reference: i64, negotiated: Option<i64>) -> NegotiationState {
        NegotiationState {
            reference_price: Decimal::from(reference),
            negotiated_price: negotiated.map(Decimal::from),
        }
    }

    fn decide(state: NegotiationState, input: BuyerInput) -> Decision {
        ConcessionLadderEngine::default().decide(&state, &input).expect("valid state")
    }

    #[test]
    fn far_below_offer_gets_one_opening_concession() {
        let decision = decide(state(150_000, None), offer(100_000));
        assert_eq!(decision.stage, Stage::TooLowInitialCounter);
        assert_eq!(decision.negotiated_price, Some(Decimal::from(147_000)));
    }

    #[test]
    fn far_below_offer_after_concession_holds() {
        let decision = decide(state(150_000, Some(143_000)), offer(50_000));
        assert_eq!(decision.stage, Stage::FinalFloorRejection);
        assert_eq!(decision.quoted_price, Decimal::from(143_000));
        assert!(!decision.changes_price());
    }

    #[test]
    fn soft_request_moves_to_mid_rung_half_up() {
        let decision = decide(state(150_000, Some(147_000)), BuyerInput::SoftRequest);
        assert_eq!(decision.stage, Stage::StageTwoOffer);
        assert_eq!(decision.negotiated_price, Some(Decimal::from(143_000)));
    }

    #[test]
    fn soft_request_moves_to_mid_rung_half_even() {
        let engine = ConcessionLadderEngine::new(ConcessionPolicy {
            rounding: RoundingMode::HalfEven,
            ..ConcessionPolicy::default()
        });
        let decision = engine
            .decide(&state(150_000, Some(147_000)), &BuyerInput::SoftRequest)
            .expect("valid state");
        assert_eq!(decision.negotiated_price, Some(Decimal::from(142_000)));
    }

    #[test]
    fn offer_at_floor_is_accepted_at_floor() {
        let decision = decide(state(150_000, None), offer(135_000));
        assert_eq!(decision.stage, Stage::Accept);
        assert_eq!(decision.negotiated_price, Some(Decimal::from(135_000)));
    }

    #[test]
    fn accepted_offer_is_rounded_by_magnitude() {
        let decision = decide(state(150_000, None), offer(138_650));
        assert_eq!(decision.stage, Stage::Accept);
        assert_eq!(decision.negotiated_price, Some(Decimal::from(139_000)));
    }

    #[test]
    fn acceptance_never_lifts_the_standing_counter() {
        let decision = decide(state(150_000, Some(143_000)), offer(146_000));
        assert_eq!(decision.stage, Stage::Accept);
        assert_eq!(decision.negotiated_price, Some(Decimal::from(143_000)));
    }

    #[test]
    fn over_generous_offer_snaps_to_reference_price() {
        for prior in [None, Some(147_000), Some(140_000)] {
            let decision = decide(state(150_000, prior), offer(175_000));
            assert_eq!(decision.stage, Stage::TooHighOffer);
            assert_eq!(decision.negotiated_price, Some(Decimal::from(150_000)));
        }
    }

    #[test]
    fn offer_equal_to_reference_is_full_price_deal() {
        let decision = decide(state(150_000, None), offer(150_000));
        assert_eq!(decision.stage, Stage::TooHighOffer);
    }

    #[test]
    fn offer_between_floors_descends_the_counter_ladder() {
        let first = decide(state(150_000, None), offer(120_000));
        assert_eq!(first.stage, Stage::InitialAskCounter);
        assert_eq!(first.negotiated_price, Some(Decimal::from(147_000)));

        let second = decide(state(150_000, Some(147_000)), offer(120_000));
        assert_eq!(second.stage, Stage::MidAskCounter);
        assert_eq!(second.negotiated_price, Some(Decimal::from(143_000)));

        let third = decide(state(150_000, Some(143_000)), offer(120_000));
        assert_eq!(third.stage, Stage::FinalAskCounter);
        assert_eq!(third.negotiated_price, Some(Decimal::from(135_000)));
    }

    #[test]
    fn settled_deal_is_restated() {
        let decision = decide(state(150_000, Some(135_000)), offer(120_000));
        assert_eq!(decision.stage, Stage::AlreadyAgreed);
        assert_eq!(decision.quoted_price, Decimal::from(135_000));
        assert!(!decision.changes_price());
    }

    #[test]
    fn offer_below_floor_holds_when_standing_counter_is_within_tolerance_of_floor() {
        let state = NegotiationState {
            reference_price: Decimal::from(150_000),
            negotiated_price: Some(Decimal::new(1_350_005, 1)),
        };

        let decision = decide(state, offer(120_000));

        assert_eq!(decision.stage, Stage::FinalFloorRejection);
        assert_eq!(decision.quoted_price, Decimal::new(1_350_005, 1));
        assert!(!decision.changes_price());
    }

    #[test]
    fn repeated_soft_request_at_floor_is_idempotent() {
        for _ in 0..3 {
            let decision = decide(state(150_000, Some(135_000)), BuyerInput::SoftRequest);
            assert_eq!(decision.stage, Stage::FinalFloorRejection);
            assert_eq!(decision.quoted_price, Decimal::from(135_000));
            assert!(!decision.changes_price());
        }
    }

    #[test]
    fn unparseable_input_changes_nothing() {
        let decision = decide(state(150_000, Some(147_000)), BuyerInput::Unparseable);
        assert_eq!(decision.stage, Stage::DefaultQuery);
        assert_eq!(decision.quoted_price, Decimal::from(147_000));
        assert!(!decision.changes_price());
    }

    #[test]
    fn negotiated_price_never_rises_except_on_full_price_offers() {
        let engine = ConcessionLadderEngine::default();
        let inputs = [
            offer(90_000),
            BuyerInput::SoftRequest,
            offer(110_000),
            BuyerInput::Unparseable,
            offer(60_000),
            offer(144_000),
            BuyerInput::SoftRequest,
            offer(120_000),
            offer(200_000),
            BuyerInput::SoftRequest,
            offer(136_400),
            BuyerInput::SoftRequest,
        ];

        let mut current = state(150_000, None);
        for input in inputs {
            let previous = current.last_agent_offer();
            let decision = engine.decide(&current, &input).expect("valid state");
            if let Some(next) = decision.negotiated_price {
                if decision.stage != Stage::TooHighOffer {
                    assert!(next <= previous, "{input:?} raised {previous} to {next}");
                }
                assert!(next >= Decimal::from(135_000), "{input:?} went below floor");
                current.negotiated_price = Some(next);
            }
        }
    }
}
