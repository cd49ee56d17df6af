//! The closed set of unit kinds and their net-capacity contribution rules.
//!
//! Units are modelled as a tagged variant rather than trait objects: the set
//! of kinds is closed, every kind is numerically homogeneous, and the
//! simulator switches on the tag. Demand, static and stochastic units are
//! context-free per hour; a storage unit is stateful and is dispatched
//! against the net profile left behind by everything before it.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{RpraError, RpraResult};
use crate::timeseries::{FloatValue, Timeseries};

/// Identifier of a unit, unique within one energy system.
pub type UnitId = u32;

/// Tag for the closed set of unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Demand,
    Static,
    Stochastic,
    Storage,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Demand => "demand",
            UnitKind::Static => "static",
            UnitKind::Stochastic => "stochastic",
            UnitKind::Storage => "storage",
        };
        write!(f, "{}", name)
    }
}

fn invalid(id: UnitId, reason: impl Into<String>) -> RpraError {
    RpraError::InvalidUnit {
        id,
        reason: reason.into(),
    }
}

fn check_series(id: UnitId, name: &str, series: &Timeseries) -> RpraResult<()> {
    if series.values().iter().any(|v| !v.is_finite()) {
        return Err(invalid(id, format!("{} contains a non-finite value", name)));
    }
    Ok(())
}

fn check_non_negative_series(id: UnitId, name: &str, series: &Timeseries) -> RpraResult<()> {
    check_series(id, name, series)?;
    if series.values().iter().any(|v| *v < 0.0) {
        return Err(invalid(id, format!("{} contains a negative value", name)));
    }
    Ok(())
}

fn check_non_negative_scalar(id: UnitId, name: &str, value: FloatValue) -> RpraResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(id, format!("{} must be finite and >= 0, got {}", name, value)));
    }
    Ok(())
}

/// A load. Contributes `-hourly_demand[h]`, identically in every trial.
///
/// The nameplate of a demand unit is the peak of its demand series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandUnit {
    id: UnitId,
    hourly_demand: Timeseries,
}

impl DemandUnit {
    pub fn new(id: UnitId, hourly_demand: Timeseries) -> RpraResult<Self> {
        check_non_negative_series(id, "hourly_demand", &hourly_demand)?;
        Ok(Self { id, hourly_demand })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn hourly_demand(&self) -> &Timeseries {
        &self.hourly_demand
    }

    /// Peak of the demand series, MW.
    pub fn nameplate_capacity(&self) -> FloatValue {
        self.hourly_demand.peak()
    }
}

/// A firm resource. Contributes `+hourly_capacity[h]`, identically in every
/// trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticUnit {
    id: UnitId,
    nameplate_capacity: FloatValue,
    hourly_capacity: Timeseries,
}

impl StaticUnit {
    pub fn new(
        id: UnitId,
        nameplate_capacity: FloatValue,
        hourly_capacity: Timeseries,
    ) -> RpraResult<Self> {
        check_non_negative_scalar(id, "nameplate_capacity", nameplate_capacity)?;
        check_non_negative_series(id, "hourly_capacity", &hourly_capacity)?;
        Ok(Self {
            id,
            nameplate_capacity,
            hourly_capacity,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn nameplate_capacity(&self) -> FloatValue {
        self.nameplate_capacity
    }

    pub fn hourly_capacity(&self) -> &Timeseries {
        &self.hourly_capacity
    }
}

/// A resource subject to independent forced outages.
///
/// For every (hour, trial) an availability draw `u ~ Uniform[0, 1)` is taken;
/// the unit contributes `+hourly_capacity[h]` iff `u >= rate[h]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticUnit {
    id: UnitId,
    nameplate_capacity: FloatValue,
    hourly_capacity: Timeseries,
    hourly_forced_outage_rate: Timeseries,
}

impl StochasticUnit {
    pub fn new(
        id: UnitId,
        nameplate_capacity: FloatValue,
        hourly_capacity: Timeseries,
        hourly_forced_outage_rate: Timeseries,
    ) -> RpraResult<Self> {
        check_non_negative_scalar(id, "nameplate_capacity", nameplate_capacity)?;
        check_non_negative_series(id, "hourly_capacity", &hourly_capacity)?;
        check_series(id, "hourly_forced_outage_rate", &hourly_forced_outage_rate)?;
        if hourly_forced_outage_rate
            .values()
            .iter()
            .any(|r| !(0.0..=1.0).contains(r))
        {
            return Err(invalid(
                id,
                "hourly_forced_outage_rate must lie in [0, 1]",
            ));
        }
        if hourly_capacity.time_axis() != hourly_forced_outage_rate.time_axis() {
            return Err(invalid(
                id,
                "hourly_capacity and hourly_forced_outage_rate must share a time axis",
            ));
        }
        Ok(Self {
            id,
            nameplate_capacity,
            hourly_capacity,
            hourly_forced_outage_rate,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn nameplate_capacity(&self) -> FloatValue {
        self.nameplate_capacity
    }

    pub fn hourly_capacity(&self) -> &Timeseries {
        &self.hourly_capacity
    }

    pub fn hourly_forced_outage_rate(&self) -> &Timeseries {
        &self.hourly_forced_outage_rate
    }
}

/// A stateful store dispatched against the pre-storage net profile.
///
/// Round-trip efficiency is split symmetrically: each leg applies
/// `sqrt(roundtrip_efficiency)`, so a full cycle returns
/// `roundtrip_efficiency` of the energy drawn at the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUnit {
    id: UnitId,
    nameplate_capacity: FloatValue,
    charge_rate: FloatValue,
    discharge_rate: FloatValue,
    charge_capacity: FloatValue,
    roundtrip_efficiency: FloatValue,
}

impl StorageUnit {
    pub fn new(
        id: UnitId,
        nameplate_capacity: FloatValue,
        charge_rate: FloatValue,
        discharge_rate: FloatValue,
        charge_capacity: FloatValue,
        roundtrip_efficiency: FloatValue,
    ) -> RpraResult<Self> {
        check_non_negative_scalar(id, "nameplate_capacity", nameplate_capacity)?;
        check_non_negative_scalar(id, "charge_rate", charge_rate)?;
        check_non_negative_scalar(id, "discharge_rate", discharge_rate)?;
        check_non_negative_scalar(id, "charge_capacity", charge_capacity)?;
        if !roundtrip_efficiency.is_finite()
            || roundtrip_efficiency <= 0.0
            || roundtrip_efficiency > 1.0
        {
            return Err(invalid(
                id,
                format!(
                    "roundtrip_efficiency must lie in (0, 1], got {}",
                    roundtrip_efficiency
                ),
            ));
        }
        Ok(Self {
            id,
            nameplate_capacity,
            charge_rate,
            discharge_rate,
            charge_capacity,
            roundtrip_efficiency,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn nameplate_capacity(&self) -> FloatValue {
        self.nameplate_capacity
    }

    pub fn charge_rate(&self) -> FloatValue {
        self.charge_rate
    }

    pub fn discharge_rate(&self) -> FloatValue {
        self.discharge_rate
    }

    pub fn charge_capacity(&self) -> FloatValue {
        self.charge_capacity
    }

    pub fn roundtrip_efficiency(&self) -> FloatValue {
        self.roundtrip_efficiency
    }

    /// Dispatch this unit against one trial's pre-storage net profile,
    /// updating the profile in place.
    ///
    /// State of charge starts empty and is integrated forward hour by hour:
    /// surplus hours charge (the unit acts as load), deficit hours discharge
    /// up to the stored energy deliverable at the bus. SoC stays within
    /// `[0, charge_capacity]` throughout.
    pub fn dispatch(&self, net: &mut Array1<FloatValue>) {
        let leg_efficiency = self.roundtrip_efficiency.sqrt();
        let mut soc: FloatValue = 0.0;
        for n in net.iter_mut() {
            if *n >= 0.0 && soc < self.charge_capacity {
                let charged = n.min(self.charge_rate).min(self.charge_capacity - soc);
                soc = (soc + charged * leg_efficiency).min(self.charge_capacity);
                *n -= charged;
            } else if *n < 0.0 && soc > 0.0 {
                let deficit = -*n;
                let discharged = deficit
                    .min(self.discharge_rate)
                    .min(soc * leg_efficiency);
                soc = (soc - discharged / leg_efficiency).max(0.0);
                *n += discharged;
            }
        }
    }
}

/// A unit of an energy system: exactly one of the four kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnergyUnit {
    Demand(DemandUnit),
    Static(StaticUnit),
    Stochastic(StochasticUnit),
    Storage(StorageUnit),
}

impl EnergyUnit {
    pub fn id(&self) -> UnitId {
        match self {
            EnergyUnit::Demand(unit) => unit.id(),
            EnergyUnit::Static(unit) => unit.id(),
            EnergyUnit::Stochastic(unit) => unit.id(),
            EnergyUnit::Storage(unit) => unit.id(),
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            EnergyUnit::Demand(_) => UnitKind::Demand,
            EnergyUnit::Static(_) => UnitKind::Static,
            EnergyUnit::Stochastic(_) => UnitKind::Stochastic,
            EnergyUnit::Storage(_) => UnitKind::Storage,
        }
    }

    /// Nameplate capacity in MW. For a demand unit this is the demand peak.
    pub fn nameplate_capacity(&self) -> FloatValue {
        match self {
            EnergyUnit::Demand(unit) => unit.nameplate_capacity(),
            EnergyUnit::Static(unit) => unit.nameplate_capacity(),
            EnergyUnit::Stochastic(unit) => unit.nameplate_capacity(),
            EnergyUnit::Storage(unit) => unit.nameplate_capacity(),
        }
    }

    /// The time series this unit constrains the simulation window with.
    pub fn series(&self) -> Vec<&Timeseries> {
        match self {
            EnergyUnit::Demand(unit) => vec![unit.hourly_demand()],
            EnergyUnit::Static(unit) => vec![unit.hourly_capacity()],
            EnergyUnit::Stochastic(unit) => {
                vec![unit.hourly_capacity(), unit.hourly_forced_outage_rate()]
            }
            EnergyUnit::Storage(_) => vec![],
        }
    }
}

impl From<DemandUnit> for EnergyUnit {
    fn from(unit: DemandUnit) -> Self {
        EnergyUnit::Demand(unit)
    }
}

impl From<StaticUnit> for EnergyUnit {
    fn from(unit: StaticUnit) -> Self {
        EnergyUnit::Static(unit)
    }
}

impl From<StochasticUnit> for EnergyUnit {
    fn from(unit: StochasticUnit) -> Self {
        EnergyUnit::Stochastic(unit)
    }
}

impl From<StorageUnit> for EnergyUnit {
    fn from(unit: StorageUnit) -> Self {
        EnergyUnit::Storage(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    fn hours(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| i as f64))
    }

    #[test]
    fn demand_nameplate_is_peak() {
        let unit =
            DemandUnit::new(0, Timeseries::from_values(array![80.0, 120.0, 95.0], hours(3)))
                .unwrap();
        assert_eq!(unit.nameplate_capacity(), 120.0);
    }

    #[test]
    fn negative_demand_rejected() {
        let result = DemandUnit::new(0, Timeseries::from_values(array![10.0, -1.0], hours(2)));
        assert!(matches!(result, Err(RpraError::InvalidUnit { id: 0, .. })));
    }

    #[test]
    fn outage_rate_outside_unit_interval_rejected() {
        let capacity = Timeseries::from_values(array![50.0, 50.0], hours(2));
        let rate = Timeseries::from_values(array![0.1, 1.5], hours(2));
        let result = StochasticUnit::new(1, 50.0, capacity, rate);
        assert!(matches!(result, Err(RpraError::InvalidUnit { id: 1, .. })));
    }

    #[test]
    fn stochastic_series_must_share_axis() {
        let capacity = Timeseries::from_values(array![50.0, 50.0], hours(2));
        let rate = Timeseries::from_values(array![0.1, 0.1], array![5.0, 6.0]);
        assert!(StochasticUnit::new(1, 50.0, capacity, rate).is_err());
    }

    #[test]
    fn storage_efficiency_bounds() {
        assert!(StorageUnit::new(2, 100.0, 100.0, 100.0, 100.0, 0.0).is_err());
        assert!(StorageUnit::new(2, 100.0, 100.0, 100.0, 100.0, 1.1).is_err());
        assert!(StorageUnit::new(2, 100.0, 100.0, 100.0, 100.0, 1.0).is_ok());
    }

    #[test]
    fn storage_attributes_are_exposed() {
        let storage = StorageUnit::new(4, 60.0, 30.0, 45.0, 120.0, 0.9).unwrap();
        assert_eq!(storage.id(), 4);
        assert_eq!(storage.nameplate_capacity(), 60.0);
        assert_eq!(storage.charge_rate(), 30.0);
        assert_eq!(storage.discharge_rate(), 45.0);
        assert_eq!(storage.charge_capacity(), 120.0);
        assert_eq!(storage.roundtrip_efficiency(), 0.9);
    }

    #[test]
    fn lossless_storage_smooths_alternating_profile() {
        let storage = StorageUnit::new(0, 100.0, 100.0, 100.0, 100.0, 1.0).unwrap();
        let mut net = array![100.0, -100.0, 100.0, -100.0];
        storage.dispatch(&mut net);
        assert_eq!(net, array![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn lossy_storage_delivers_roundtrip_fraction() {
        // With eta = 0.5 each leg applies sqrt(0.5): a full 100 MWh charge
        // stores ~70.71 MWh of SoC, which discharges as 50 MW at the bus.
        let storage = StorageUnit::new(0, 100.0, 100.0, 100.0, 100.0, 0.5).unwrap();
        let mut net = array![100.0, -100.0, 100.0, -100.0];
        storage.dispatch(&mut net);
        assert!(is_close!(net[0], 0.0));
        assert!(is_close!(net[1], -50.0));
        assert!(is_close!(net[2], 0.0));
        assert!(is_close!(net[3], -50.0));
    }

    #[test]
    fn discharge_never_exceeds_charged_energy_times_efficiency() {
        let eta = 0.81;
        let storage = StorageUnit::new(0, 50.0, 50.0, 50.0, 120.0, eta).unwrap();
        let mut net = array![30.0, 45.0, -60.0, -60.0, -60.0, 10.0, -5.0];
        let before = net.clone();
        storage.dispatch(&mut net);

        let charged: f64 = before
            .iter()
            .zip(net.iter())
            .filter(|(b, _)| **b >= 0.0)
            .map(|(b, a)| b - a)
            .sum();
        let discharged: f64 = before
            .iter()
            .zip(net.iter())
            .filter(|(b, _)| **b < 0.0)
            .map(|(b, a)| a - b)
            .sum();
        assert!(discharged <= charged * eta + 1e-9);
    }

    #[test]
    fn charge_respects_rate_and_capacity() {
        let storage = StorageUnit::new(0, 10.0, 10.0, 10.0, 15.0, 1.0).unwrap();
        let mut net = array![25.0, 25.0, -30.0];
        storage.dispatch(&mut net);
        // First hour limited by charge rate, second by remaining headroom.
        assert_eq!(net[0], 15.0);
        assert_eq!(net[1], 20.0);
        // Discharge limited by the 10 MW discharge rate.
        assert_eq!(net[2], -20.0);
    }
}
