use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog record as seen by the negotiation engine.
///
/// `reference_price` is fixed once listed. `negotiated_price` is the only
/// field the engine writes: `None` (or a value equal to the reference price)
/// means no agreement has been reached yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiableProduct {
    pub id: ProductId,
    pub name: String,
    pub reference_price: Decimal,
    pub currency_code: String,
    pub is_negotiable: bool,
    pub negotiated_price: Option<Decimal>,
}

impl NegotiableProduct {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        reference_price: Decimal,
        currency_code: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId(id.into()),
            name: name.into(),
            reference_price,
            currency_code: currency_code.into(),
            is_negotiable: true,
            negotiated_price: None,
        }
    }

    pub fn with_negotiated_price(mut self, price: Decimal) -> Self {
        self.negotiated_price = Some(price);
        self
    }

    pub fn non_negotiable(mut self) -> Self {
        self.is_negotiable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{NegotiableProduct, ProductId};

    #[test]
    fn new_listings_are_open_for_negotiation() {
        let product = NegotiableProduct::new("P-1", "Kanga", Decimal::from(150_000), "TZS");
        assert_eq!(product.id, ProductId("P-1".to_string()));
        assert!(product.is_negotiable);
        assert_eq!(product.negotiated_price, None);
    }

    #[test]
    fn builders_set_the_negotiated_price_and_fixed_flag() {
        let product = NegotiableProduct::new("P-1", "Kanga", Decimal::from(150_000), "TZS")
            .with_negotiated_price(Decimal::from(147_000))
            .non_negotiable();
        assert_eq!(product.negotiated_price, Some(Decimal::from(147_000)));
        assert!(!product.is_negotiable);
        assert_eq!(product.reference_price, Decimal::from(150_000));
    }
}
