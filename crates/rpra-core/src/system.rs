//! Energy system container and its builder.
//!
//! A system is an immutable, id-sorted collection of units. All mutation
//! happens on the builder; `build` takes a snapshot, so a builder can keep
//! evolving after producing a system.

use indexmap::IndexMap;

use crate::errors::{RpraError, RpraResult};
use crate::timeseries::FloatValue;
use crate::unit::{EnergyUnit, UnitId, UnitKind};

/// Immutable collection of units keyed by id.
///
/// Safe to share across simulations; a [`std::sync::Arc`] wrapper is the
/// expected way to do so.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySystem {
    units: IndexMap<UnitId, EnergyUnit>,
}

impl EnergySystem {
    /// Number of units in the system.
    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// Sum of nameplate capacities over all non-demand units, MW.
    pub fn system_capacity(&self) -> FloatValue {
        self.units
            .values()
            .filter(|unit| unit.kind() != UnitKind::Demand)
            .map(|unit| unit.nameplate_capacity())
            .sum()
    }

    pub fn unit(&self, id: UnitId) -> Option<&EnergyUnit> {
        self.units.get(&id)
    }

    /// Units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &EnergyUnit> {
        self.units.values()
    }

    /// The subset of units of `kind`, in ascending id order.
    pub fn get_units_by_kind(&self, kind: UnitKind) -> Vec<&EnergyUnit> {
        self.units
            .values()
            .filter(|unit| unit.kind() == kind)
            .collect()
    }

    /// Largest registered id, or `None` for an empty system.
    pub fn max_id(&self) -> Option<UnitId> {
        self.units.keys().max().copied()
    }
}

/// Mutable accumulator of units; `build` snapshots it into an
/// [`EnergySystem`].
#[derive(Debug, Clone, Default)]
pub struct EnergySystemBuilder {
    units: IndexMap<UnitId, EnergyUnit>,
}

impl EnergySystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the units of an existing system.
    pub fn from_system(system: &EnergySystem) -> Self {
        Self {
            units: system.units.clone(),
        }
    }

    /// Register a unit. Fails without mutating when the id is taken.
    pub fn add_unit(&mut self, unit: impl Into<EnergyUnit>) -> RpraResult<()> {
        let unit = unit.into();
        let id = unit.id();
        if self.units.contains_key(&id) {
            return Err(RpraError::DuplicateId(id));
        }
        self.units.insert(id, unit);
        Ok(())
    }

    /// Drop the unit with `id`.
    pub fn remove_unit(&mut self, id: UnitId) -> RpraResult<()> {
        self.units
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(RpraError::UnknownId(id))
    }

    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// Snapshot the current unit set as an immutable system.
    ///
    /// The builder stays usable and further mutation does not affect the
    /// returned system.
    pub fn build(&self) -> EnergySystem {
        let mut units = self.units.clone();
        units.sort_keys();
        EnergySystem { units }
    }
}
