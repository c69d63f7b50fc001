//! Deterministic core of the bazaar negotiation engine: domain records,
//! the concession ladder, reply templates, configuration and error taxonomy.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod negotiation;

pub use audit::{AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use domain::product::{NegotiableProduct, ProductId};
pub use domain::session::{Language, NegotiationSession, SessionKey, Speaker, TranscriptEntry};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use negotiation::{
    BuyerInput, ConcessionLadderEngine, ConcessionPolicy, Decision, NegotiationState,
    NegotiationStrategy, PriceLadder, RoundingMode, Stage,
};
