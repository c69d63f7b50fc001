use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::domain::product::NegotiableProduct;

use crate::repositories::{ProductCatalog, RepositoryError};

/// Demo listings covering each rounding magnitude and the non-negotiable gate.
const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "kanga-set-001",
        name: "Hand-printed kanga set",
        reference_price_cents: 15_000_000,
        currency_code: "TZS",
        is_negotiable: true,
    },
    SeedProduct {
        id: "carved-stool-002",
        name: "Mpingo carved stool",
        reference_price_cents: 480_000,
        currency_code: "KES",
        is_negotiable: true,
    },
    SeedProduct {
        id: "beaded-bracelet-003",
        name: "Beaded bracelet",
        reference_price_cents: 2_450,
        currency_code: "USD",
        is_negotiable: true,
    },
    SeedProduct {
        id: "gift-card-004",
        name: "Store gift card",
        reference_price_cents: 5_000_000,
        currency_code: "TZS",
        is_negotiable: false,
    },
];

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    reference_price_cents: i64,
    currency_code: &'static str,
    is_negotiable: bool,
}

impl SeedProduct {
    fn to_product(&self) -> NegotiableProduct {
        let product = NegotiableProduct::new(
            self.id,
            self.name,
            Decimal::new(self.reference_price_cents, 2),
            self.currency_code,
        );
        if self.is_negotiable {
            product
        } else {
            product.non_negotiable()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub product_ids: Vec<String>,
}

pub fn demo_catalog() -> Vec<NegotiableProduct> {
    SEED_PRODUCTS.iter().map(SeedProduct::to_product).collect()
}

pub async fn seed_catalog<C>(catalog: &C) -> Result<SeedResult, RepositoryError>
where
    C: ProductCatalog + ?Sized,
{
    let mut product_ids = Vec::with_capacity(SEED_PRODUCTS.len());
    for product in demo_catalog() {
        product_ids.push(product.id.0.clone());
        catalog.save(product).await?;
    }

    Ok(SeedResult { products_seeded: product_ids.len(), product_ids })
}
