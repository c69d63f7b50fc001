//! Conversational negotiation on top of `bazaar-core`.
//!
//! A buyer message flows through:
//! 1. **Interpretation** (`conversation`) - read an offer, a request for a
//!    lower price, or nothing usable; detect the session language.
//! 2. **Guardrails** (`guardrails`) - refuse fixed-price listings before any
//!    price logic runs.
//! 3. **Decision** (`runtime`) - apply the concession ladder and render the
//!    localized reply. Pure: no storage, no clock beyond transcript stamps.
//! 4. **Persistence** (`service`) - load and store product and session state
//!    through the catalog and session collaborators, one turn per product at
//!    a time.
//!
//! Prices are never chosen from free text alone: the interpreter only reports
//! what the buyer said, and the ladder decides what the seller answers.

pub mod conversation;
pub mod guardrails;
pub mod runtime;
pub mod service;

pub use conversation::{OfferInterpreter, OfferParseError};
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use runtime::{NegotiationRuntime, TurnOutcome};
pub use service::{AcceptanceOutcome, AcceptanceRejection, NegotiationService};
