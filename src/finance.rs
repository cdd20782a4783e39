//! General functions related to finance.
use crate::technology::TechnologyDefinition;
use crate::units::{Dimensionless, Energy, Money, MoneyPerCapacity, MoneyPerEnergy};

/// Served energy below this value is treated as this value when levelising costs
pub const MIN_SERVED_ENERGY: Energy = Energy(1e-6);

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annual capital cost per unit of capacity
pub fn annual_capital_cost(
    capital_cost: MoneyPerCapacity,
    lifetime: u32,
    discount_rate: Dimensionless,
) -> MoneyPerCapacity {
    let crf = capital_recovery_factor(lifetime, discount_rate);
    capital_cost * crf
}

/// Calculates the annualised fixed cost per unit of capacity for a technology.
///
/// This is the annualised capital cost plus fixed operating cost. Storage is sized by energy, so
/// its capital cost is already per MWh and its fixed operating cost (per MW) is spread over the
/// technology's duration.
pub fn annualised_fixed_cost(technology: &TechnologyDefinition) -> MoneyPerCapacity {
    let capital = annual_capital_cost(
        technology.capital_cost,
        technology.lifetime,
        technology.discount_rate,
    );

    let fixed_operating_cost = if technology.is_storage() {
        technology.fixed_operating_cost / technology.duration
    } else {
        technology.fixed_operating_cost
    };

    capital + fixed_operating_cost
}

/// The cost of generating one more MWh with the technology
pub fn marginal_cost(technology: &TechnologyDefinition) -> MoneyPerEnergy {
    technology.variable_operating_cost + technology.fuel_cost
}

/// Levelised cost of energy for a total cost and the energy served.
///
/// The denominator is floored at [`MIN_SERVED_ENERGY`] so the result is always finite.
pub fn levelised_cost(total_cost: Money, served: Energy) -> MoneyPerEnergy {
    total_cost / served.max(MIN_SERVED_ENERGY)
}
