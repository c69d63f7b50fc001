use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Midpoint handling for magnitude rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 142,500 -> 143,000
    #[default]
    HalfUp,
    /// 142,500 -> 142,000
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl std::str::FromStr for RoundingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "half_up" | "half-up" => Ok(Self::HalfUp),
            "half_even" | "half-even" | "bankers" => Ok(Self::HalfEven),
            other => Err(format!("unsupported rounding mode `{other}` (expected half_up|half_even)")),
        }
    }
}

/// Ratios of the reference price that define the concession ladder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcessionPolicy {
    pub opening_ratio: Decimal,
    pub mid_ratio: Decimal,
    pub floor_ratio: Decimal,
    pub engagement_ratio: Decimal,
    pub concession_guard_ratio: Decimal,
    pub rounding: RoundingMode,
}

impl Default for ConcessionPolicy {
    fn default() -> Self {
        Self {
            opening_ratio: Decimal::new(98, 2),
            mid_ratio: Decimal::new(95, 2),
            floor_ratio: Decimal::new(90, 2),
            engagement_ratio: Decimal::new(70, 2),
            concession_guard_ratio: Decimal::new(99, 2),
            rounding: RoundingMode::HalfUp,
        }
    }
}

/// A step below the reference price the agent can concede to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rung {
    Opening,
    Mid,
    Floor,
}

/// Price points derived from one reference price.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceLadder {
    reference_price: Decimal,
    opening: Decimal,
    mid: Decimal,
    floor: Decimal,
    engagement_floor: Decimal,
    concession_guard: Decimal,
    rounding: RoundingMode,
}

impl PriceLadder {
    pub fn for_reference(
        reference_price: Decimal,
        policy: &ConcessionPolicy,
    ) -> Result<Self, DomainError> {
        if reference_price <= Decimal::ZERO {
            return Err(DomainError::InvalidReferencePrice(reference_price));
        }

        let rounding = policy.rounding;
        let round = |value: Decimal| round_by_magnitude(value, reference_price, rounding);

        // Rounding to the nearest 100 can lift 98% of a small price above the price itself.
        let opening = round(reference_price * policy.opening_ratio).min(reference_price);
        let mid = round(reference_price * policy.mid_ratio).min(opening);
        let floor = round(reference_price * policy.floor_ratio).min(mid);

        Ok(Self {
            reference_price,
            opening,
            mid,
            floor,
            engagement_floor: reference_price * policy.engagement_ratio,
            concession_guard: reference_price * policy.concession_guard_ratio,
            rounding,
        })
    }

    pub fn reference_price(&self) -> Decimal {
        self.reference_price
    }

    pub fn opening(&self) -> Decimal {
        self.opening
    }

    pub fn mid(&self) -> Decimal {
        self.mid
    }

    pub fn floor(&self) -> Decimal {
        self.floor
    }

    pub fn engagement_floor(&self) -> Decimal {
        self.engagement_floor
    }

    pub fn price_of(&self, rung: Rung) -> Decimal {
        match rung {
            Rung::Opening => self.opening,
            Rung::Mid => self.mid,
            Rung::Floor => self.floor,
        }
    }

    pub fn round(&self, value: Decimal) -> Decimal {
        round_by_magnitude(value, self.reference_price, self.rounding)
    }

    /// True while the agent is still at (or within 1% of) the full price.
    pub fn has_not_conceded(&self, last_agent_offer: Decimal) -> bool {
        last_agent_offer >= self.concession_guard
    }

    /// Minimum gap between the standing offer and a rung for the rung to
    /// count as a further concession.
    fn tolerance(&self) -> Decimal {
        if self.reference_price >= Decimal::from(1_000) {
            Decimal::ONE
        } else {
            Decimal::new(1, 2)
        }
    }

    /// The next rung strictly below `last_agent_offer`, or `None` once the
    /// agent is already at the floor.
    pub fn next_rung(&self, last_agent_offer: Decimal) -> Option<Rung> {
        let tolerance = self.tolerance();

        if self.has_not_conceded(last_agent_offer) && self.opening < last_agent_offer {
            Some(Rung::Opening)
        } else if last_agent_offer > self.mid + tolerance {
            Some(Rung::Mid)
        } else if last_agent_offer > self.floor + tolerance {
            Some(Rung::Floor)
        } else {
            None
        }
    }

    /// Whether a stored negotiated price is a settled deal at or below the floor.
    pub fn is_settled(&self, negotiated_price: Decimal) -> bool {
        negotiated_price <= self.floor && negotiated_price < self.reference_price
    }
}

/// Rounds `value` to a step chosen by the magnitude of `reference_price`:
/// nearest 1,000 from 100,000 up, nearest 100 from 1,000 up, otherwise cents.
pub fn round_by_magnitude(value: Decimal, reference_price: Decimal, mode: RoundingMode) -> Decimal {
    let strategy = mode.strategy();
    let step = if reference_price >= Decimal::from(100_000) {
        Decimal::from(1_000)
    } else if reference_price >= Decimal::from(1_000) {
        Decimal::from(100)
    } else {
        return value.round_dp_with_strategy(2, strategy);
    };

    (value / step).round_dp_with_strategy(0, strategy) * step
}
