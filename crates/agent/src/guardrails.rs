use rust_decimal::Decimal;

use bazaar_core::domain::product::NegotiableProduct;
use bazaar_core::errors::DomainError;
use bazaar_core::negotiation::Stage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    /// The turn is refused outright; the product is left untouched.
    Deny { reason_code: &'static str, error: DomainError, fallback_stage: Stage },
}

impl GuardrailDecision {
    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason_code, .. } => Some(reason_code),
        }
    }
}

/// Checks a listing before any buyer message is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy;

impl GuardrailPolicy {
    pub fn evaluate(&self, product: &NegotiableProduct) -> GuardrailDecision {
        if product.reference_price <= Decimal::ZERO {
            return GuardrailDecision::Deny {
                reason_code: "invalid_reference_price",
                error: DomainError::InvalidReferencePrice(product.reference_price),
                fallback_stage: Stage::NotNegotiable,
            };
        }

        if !product.is_negotiable {
            return GuardrailDecision::Deny {
                reason_code: "product_not_negotiable",
                error: DomainError::NotNegotiable { product_id: product.id.clone() },
                fallback_stage: Stage::NotNegotiable,
            };
        }

        GuardrailDecision::Allow
    }
}
