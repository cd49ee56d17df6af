//! Monte Carlo synthesis of the net hourly capacity matrix.
//!
//! A run sums the deterministic contributions of demand and static units
//! once, samples stochastic availability per (unit, hour, trial), and then
//! folds storage units over each trial's profile in ascending id order.
//! Trials are independent columns and are evaluated in parallel; the
//! per-(unit, trial) RNG streams keep the result identical for a given seed
//! regardless of how many workers participate.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{RpraError, RpraResult};
use crate::rng::stream_seed;
use crate::system::EnergySystem;
use crate::timeseries::{CapacityMatrix, FloatValue, Time, TimeAxis, Timeseries};
use crate::unit::{EnergyUnit, UnitId};

/// Spacing slack when deriving the hour count of a window.
const WINDOW_TOLERANCE: Time = 1e-6;

/// Configuration of a simulation: study window, trial count and seed.
///
/// With `seed: None` a seed is drawn from OS entropy when the simulation is
/// constructed; pass `Some` to make runs reproducible across processes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start_hour: Time,
    pub end_hour: Time,
    pub trial_size: usize,
    pub seed: Option<u64>,
}

/// A Monte Carlo simulation of one energy system over one study window.
///
/// The simulation owns its net-capacity matrix; the system it points at is
/// shared and read-only.
#[derive(Debug)]
pub struct ProbabilisticSimulation {
    config: SimulationConfig,
    seed: u64,
    system: Option<Arc<EnergySystem>>,
    matrix: Option<CapacityMatrix>,
}

impl ProbabilisticSimulation {
    /// Create a simulation, validating the window and resolving the seed.
    pub fn new(config: SimulationConfig) -> RpraResult<Self> {
        if !config.start_hour.is_finite()
            || !config.end_hour.is_finite()
            || config.start_hour >= config.end_hour
        {
            return Err(RpraError::InvalidWindow {
                start: config.start_hour,
                end: config.end_hour,
            });
        }
        let seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            config,
            seed,
            system: None,
            matrix: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The seed actually used for sampling. Equals `config.seed` when one
    /// was supplied.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Associate a system with this simulation, invalidating any matrix
    /// computed for a previous system.
    pub fn assign_energy_system(&mut self, system: Arc<EnergySystem>) {
        self.system = Some(system);
        self.matrix = None;
    }

    /// The net hourly capacity matrix of the last `run`.
    pub fn net_hourly_capacity_matrix(&self) -> RpraResult<&CapacityMatrix> {
        self.matrix.as_ref().ok_or(RpraError::NotRun)
    }

    /// Compute the net hourly capacity matrix.
    ///
    /// Re-running with unchanged state recomputes an identical matrix.
    pub fn run(&mut self) -> RpraResult<()> {
        let system = self
            .system
            .clone()
            .ok_or(RpraError::NoSystemAssigned)?;
        self.matrix = None;

        let time_axis = Arc::new(self.effective_axis(&system)?);
        let hours = time_axis.len();
        let start = time_axis.first();
        let trials = self.config.trial_size;

        // Deterministic base profile shared by every trial.
        let mut base = Array1::<FloatValue>::zeros(hours);
        let mut stochastic = Vec::new();
        let mut storage = Vec::new();
        for unit in system.iter() {
            match unit {
                EnergyUnit::Demand(demand) => {
                    base -= &window(demand.hourly_demand(), demand.id(), start, hours)?;
                }
                EnergyUnit::Static(firm) => {
                    base += &window(firm.hourly_capacity(), firm.id(), start, hours)?;
                }
                EnergyUnit::Stochastic(unit) => {
                    let capacity = window(unit.hourly_capacity(), unit.id(), start, hours)?;
                    let rate =
                        window(unit.hourly_forced_outage_rate(), unit.id(), start, hours)?;
                    stochastic.push((unit.id(), capacity, rate));
                }
                EnergyUnit::Storage(store) => storage.push(store),
            }
        }
        // Storage sees the net profile left by units dispatched before it.
        storage.sort_by_key(|store| store.id());

        let seed = self.seed;
        let columns: Vec<Array1<FloatValue>> = (0..trials)
            .into_par_iter()
            .map(|trial| {
                let mut column = base.clone();
                for (unit_id, capacity, rate) in &stochastic {
                    sample_availability(seed, *unit_id, trial, capacity, rate, &mut column);
                }
                for store in &storage {
                    store.dispatch(&mut column);
                }
                column
            })
            .collect();

        debug!(hours, trials, seed, "computed net hourly capacity matrix");
        self.matrix = Some(CapacityMatrix::from_columns(time_axis, &columns));
        Ok(())
    }

    /// Intersection of the configured window with the range of every series
    /// in the system, as an hourly axis.
    fn effective_axis(&self, system: &EnergySystem) -> RpraResult<TimeAxis> {
        let mut lo = self.config.start_hour;
        let mut hi = self.config.end_hour;
        for unit in system.iter() {
            for series in unit.series() {
                let (first, last) = series.time_axis().bounds();
                lo = lo.max(first);
                hi = hi.min(last);
            }
        }
        let hours = ((hi - lo) + WINDOW_TOLERANCE).floor() as i64;
        if lo >= hi || hours < 1 {
            return Err(RpraError::InvalidWindow { start: lo, end: hi });
        }
        Ok(TimeAxis::hourly(lo, hours as usize))
    }
}

fn window(
    series: &Timeseries,
    unit_id: UnitId,
    start: Time,
    hours: usize,
) -> RpraResult<Array1<FloatValue>> {
    series
        .window_values(start, hours)
        .map(|view| view.to_owned())
        .ok_or(RpraError::MissingTimeSeriesCoverage {
            unit_id,
            start,
            end: start + hours as Time,
        })
}

/// Add one stochastic unit's sampled contribution to a trial column.
///
/// The unit is available in hour `h` iff `u >= rate[h]` for an independent
/// draw `u ~ Uniform[0, 1)`.
fn sample_availability(
    seed: u64,
    unit_id: UnitId,
    trial: usize,
    capacity: &Array1<FloatValue>,
    rate: &Array1<FloatValue>,
    column: &mut Array1<FloatValue>,
) {
    let mut rng = StdRng::seed_from_u64(stream_seed(seed, unit_id, trial));
    for hour in 0..column.len() {
        let draw: f64 = rng.random();
        if draw >= rate[hour] {
            column[hour] += capacity[hour];
        }
    }
}
