//! Rule-based price negotiation.
//!
//! A turn flows through three pieces: the caller interprets the buyer's
//! message into a [`BuyerInput`], the [`ConcessionLadderEngine`] decides the
//! next counter-offer against a [`PriceLadder`], and [`templates::render`]
//! turns the resulting [`Stage`] into a localized reply.

pub mod engine;
pub mod ladder;
pub mod money;
pub mod templates;

use serde::{Deserialize, Serialize};

pub use engine::{
    BuyerInput, ConcessionLadderEngine, Decision, NegotiationState, NegotiationStrategy,
};
pub use ladder::{round_by_magnitude, ConcessionPolicy, PriceLadder, RoundingMode, Rung};

/// Reply template key produced by a negotiation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Accept,
    FinalFloorRejection,
    InitialAskCounter,
    MidAskCounter,
    FinalAskCounter,
    TooLowInitialCounter,
    DefaultQuery,
    AlreadyAgreed,
    TooHighOffer,
    StageOneOffer,
    StageTwoOffer,
    FinalOffer,
    NotNegotiable,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::Accept,
        Stage::FinalFloorRejection,
        Stage::InitialAskCounter,
        Stage::MidAskCounter,
        Stage::FinalAskCounter,
        Stage::TooLowInitialCounter,
        Stage::DefaultQuery,
        Stage::AlreadyAgreed,
        Stage::TooHighOffer,
        Stage::StageOneOffer,
        Stage::StageTwoOffer,
        Stage::FinalOffer,
        Stage::NotNegotiable,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::FinalFloorRejection => "final_floor_rejection",
            Self::InitialAskCounter => "initial_ask_counter",
            Self::MidAskCounter => "mid_ask_counter",
            Self::FinalAskCounter => "final_ask_counter",
            Self::TooLowInitialCounter => "too_low_initial_counter",
            Self::DefaultQuery => "default_query",
            Self::AlreadyAgreed => "already_agreed",
            Self::TooHighOffer => "too_high_offer",
            Self::StageOneOffer => "stage_one_offer",
            Self::StageTwoOffer => "stage_two_offer",
            Self::FinalOffer => "final_offer",
            Self::NotNegotiable => "not_negotiable",
        }
    }
}
