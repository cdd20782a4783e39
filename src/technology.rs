//! Technologies are the generation and storage options which can be built. The data structures in
//! this module describe their economics and how they interact with the hourly weather data.
use crate::hour::HourlyRecord;
use crate::id::define_id_type;
use crate::units::{
    Capacity, Dimensionless, EmissionsPerEnergy, Hours, MoneyPerCapacity, MoneyPerEnergy,
};
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

define_id_type! {TechnologyID}

/// The role a technology plays in the system
#[derive(
    PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum TechnologyCategory {
    /// Weather-dependent generation (solar, wind etc.)
    #[string = "renewable"]
    Renewable,
    /// Energy storage, sized by energy capacity
    #[string = "storage"]
    Storage,
    /// Fuel-burning plant which can be dispatched freely up to its capacity
    #[string = "dispatchable"]
    Dispatchable,
    /// Plant intended to run continuously (e.g. nuclear)
    #[string = "baseload"]
    Baseload,
}

/// The weather resource driving a renewable technology's availability
#[derive(
    PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum Resource {
    #[string = "solar"]
    /// Solar irradiance
    Solar,
    #[string = "wind"]
    /// Onshore wind
    Wind,
    #[string = "offshore"]
    /// Offshore wind
    Offshore,
}

/// The economic and physical definition of a technology
#[derive(PartialEq, Clone, Debug)]
pub struct TechnologyDefinition {
    /// A unique identifier for the technology (e.g. `solar_pv`)
    pub id: TechnologyID,
    /// The role of the technology in the system
    pub category: TechnologyCategory,
    /// The availability resource for renewables. `None` for all other categories.
    pub resource: Option<Resource>,
    /// Overnight capital cost per MW (per MWh of energy capacity for storage)
    pub capital_cost: MoneyPerCapacity,
    /// Annual fixed operating cost per MW
    pub fixed_operating_cost: MoneyPerCapacity,
    /// Variable operating cost per MWh generated
    pub variable_operating_cost: MoneyPerEnergy,
    /// Fuel cost per MWh generated
    pub fuel_cost: MoneyPerEnergy,
    /// Economic lifetime in years
    pub lifetime: u32,
    /// Technology-specific discount rate
    pub discount_rate: Dimensionless,
    /// Emissions per MWh generated
    pub emission_factor: EmissionsPerEnergy,
    /// Round-trip efficiency, applied when charging. Always 1 for non-storage technologies.
    pub efficiency: Dimensionless,
    /// Hours of full-power operation a storage technology can sustain
    pub duration: Hours,
    /// Whether the technology may be built
    pub enabled: bool,
    /// If set, the capacity (MW) is fixed to this value rather than optimised
    pub fixed_capacity: Option<Capacity>,
}

impl TechnologyDefinition {
    /// Whether this technology is weather-dependent
    pub fn is_renewable(&self) -> bool {
        self.category == TechnologyCategory::Renewable
    }

    /// Whether this technology stores energy
    pub fn is_storage(&self) -> bool {
        self.category == TechnologyCategory::Storage
    }

    /// The fraction of capacity available in the given hour.
    ///
    /// Renewables follow the recorded factor for their resource; everything else is always fully
    /// available.
    pub fn availability(&self, record: &HourlyRecord) -> Dimensionless {
        match self.resource {
            Some(resource) if self.is_renewable() => record.availability(resource),
            _ => Dimensionless(1.0),
        }
    }

    /// The fixed capacity in the units of the capacity variable, if any.
    ///
    /// Storage capacity variables are in MWh, so a fixed power rating is scaled by the duration.
    pub fn fixed_model_capacity(&self) -> Option<Capacity> {
        let capacity = self.fixed_capacity?;
        if self.is_storage() {
            Some(capacity * self.duration)
        } else {
            Some(capacity)
        }
    }
}

/// The set of technology definitions supplied with one request.
///
/// The catalog is an explicit value handed to the model builder; nothing about it is global.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct TechnologyCatalog(IndexMap<TechnologyID, TechnologyDefinition>);

impl TechnologyCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a technology, replacing any existing definition with the same ID
    pub fn insert(&mut self, technology: TechnologyDefinition) -> Option<TechnologyDefinition> {
        self.0.insert(technology.id.clone(), technology)
    }

    /// Look up a technology by ID
    pub fn get(&self, id: &str) -> Option<&TechnologyDefinition> {
        self.0.get(id)
    }

    /// Mutable access to a technology, e.g. for toggling it on and off between requests
    pub fn get_mut(&mut self, id: &str) -> Option<&mut TechnologyDefinition> {
        self.0.get_mut(id)
    }

    /// The number of technologies in the catalog, enabled or not
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over every technology in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TechnologyDefinition> {
        self.0.values()
    }

    /// The technologies which will appear in the model, sorted by ID.
    ///
    /// Sorting means the problem layout does not depend on the order in which technologies were
    /// added or toggled. Only one storage technology is modelled; if several are enabled, the
    /// first by ID is kept and the others are dropped with a warning.
    pub fn modelled_technologies(&self) -> Vec<&TechnologyDefinition> {
        let mut storage_seen = false;
        self.0
            .values()
            .filter(|tech| tech.enabled)
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .filter(|tech| {
                if !tech.is_storage() {
                    return true;
                }
                if storage_seen {
                    warn!(
                        "Only one storage technology can be modelled; ignoring {}",
                        tech.id
                    );
                    return false;
                }
                storage_seen = true;
                true
            })
            .collect()
    }
}

impl FromIterator<TechnologyDefinition> for TechnologyCatalog {
    fn from_iter<I: IntoIterator<Item = TechnologyDefinition>>(iter: I) -> Self {
        Self(iter.into_iter().map(|tech| (tech.id.clone(), tech)).collect())
    }
}
