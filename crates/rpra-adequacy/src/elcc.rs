//! Effective load-carrying capability via seed-paired bisection.
//!
//! The solver searches for the constant demand that cancels an added
//! resource's adequacy contribution: adding the resource and that demand
//! leaves the chosen metric at its base value. Every iteration reuses the
//! template's seed, so the comparison between systems is paired sample by
//! sample and sampling noise cancels instead of breaking the monotonicity
//! of added demand.

use std::sync::Arc;
use tracing::{debug, warn};

use rpra_core::errors::{RpraError, RpraResult};
use rpra_core::simulation::{ProbabilisticSimulation, SimulationConfig};
use rpra_core::system::{EnergySystem, EnergySystemBuilder};
use rpra_core::timeseries::{CapacityMatrix, TimeAxis, Timeseries};
use rpra_core::unit::{DemandUnit, UnitId};

use crate::metrics::MetricKind;

/// Default bisection width at which the search stops, MW.
const DEFAULT_PRECISION: f64 = 0.01;

/// Default iteration budget.
const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Default absolute tolerance when comparing metric values.
const DEFAULT_METRIC_TOLERANCE: f64 = 1e-6;

/// Progress of the solver, exposed for introspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverState {
    /// Base metric not yet established.
    Evaluating,
    /// Bisecting the added-demand interval `[lo, hi]`.
    Bisecting { lo: f64, hi: f64, iteration: usize },
    /// Finished within tolerance at the contained value (MW).
    Converged(f64),
    /// Iteration budget exhausted; the contained value is the best estimate.
    Exhausted(f64),
}

/// Capacity-credit solver for additions to a base system.
pub struct EffectiveLoadCarryingCapability {
    base_system: Arc<EnergySystem>,
    config: SimulationConfig,
    metric: MetricKind,
    precision: f64,
    max_iterations: usize,
    metric_tolerance: f64,
    state: SolverState,
    base_metric: Option<f64>,
    original_matrix: Option<CapacityMatrix>,
    intermediate: Vec<(f64, CapacityMatrix)>,
}

impl EffectiveLoadCarryingCapability {
    /// Create a solver from a base system and a simulation template.
    ///
    /// The template supplies the study window, trial count and seed; its
    /// resolved seed is pinned so every bisection iteration samples the
    /// same outage draws.
    pub fn new(
        base_system: Arc<EnergySystem>,
        template: &ProbabilisticSimulation,
        metric: MetricKind,
    ) -> Self {
        let mut config = *template.config();
        config.seed = Some(template.seed());
        Self {
            base_system,
            config,
            metric,
            precision: DEFAULT_PRECISION,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            metric_tolerance: DEFAULT_METRIC_TOLERANCE,
            state: SolverState::Evaluating,
            base_metric: None,
            original_matrix: None,
            intermediate: Vec::new(),
        }
    }

    /// Set the bisection width (MW) at which the search stops.
    pub fn with_precision(&mut self, precision: f64) -> &mut Self {
        self.precision = precision;
        self
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the absolute tolerance used when comparing metric values.
    pub fn with_metric_tolerance(&mut self, metric_tolerance: f64) -> &mut Self {
        self.metric_tolerance = metric_tolerance;
        self
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    /// Metric value of the base system, once evaluated.
    pub fn base_metric(&self) -> Option<f64> {
        self.base_metric
    }

    /// Net-capacity matrix of the base system's run.
    pub fn original_net_capacity_matrix(&self) -> Option<&CapacityMatrix> {
        self.original_matrix.as_ref()
    }

    /// Every `(added_demand, matrix)` pair evaluated during the search, in
    /// evaluation order. The last entry always exists after `evaluate`.
    pub fn intermediate_net_capacity_matrices(&self) -> &[(f64, CapacityMatrix)] {
        &self.intermediate
    }

    /// Find the capacity credit of `additional_system` in MW.
    ///
    /// Returns the constant demand that, added together with
    /// `additional_system` to the base, restores the base metric. The
    /// result is bounded by `[0, additional_system.system_capacity()]`.
    pub fn evaluate(&mut self, additional_system: &EnergySystem) -> RpraResult<f64> {
        self.state = SolverState::Evaluating;
        self.base_metric = None;
        self.original_matrix = None;
        self.intermediate.clear();

        // Base run establishes the target and the study axis.
        let mut simulation = ProbabilisticSimulation::new(self.config)?;
        simulation.assign_energy_system(self.base_system.clone());
        simulation.run()?;
        let base_metric = self.metric.compute(&simulation)?;
        let base_matrix = simulation.net_hourly_capacity_matrix()?.clone();
        let window_axis = base_matrix.time_axis().clone();
        self.base_metric = Some(base_metric);
        self.original_matrix = Some(base_matrix);
        debug!(metric = %self.metric, base_metric, "evaluated base system");

        let mut hi = additional_system.system_capacity();
        if hi <= 0.0 {
            self.state = SolverState::Converged(0.0);
            return Ok(0.0);
        }

        let mut builder = EnergySystemBuilder::from_system(&self.base_system);
        for unit in additional_system.iter() {
            builder.add_unit(unit.clone())?;
        }
        let combined = builder.build();
        let probe_id = combined.max_id().map_or(0, |id| id + 1);

        // A perfect resource would carry its full nameplate; if the combined
        // system is no worse than base even at that load, hi is the answer.
        let metric_at_hi =
            self.run_with_added_demand(&combined, probe_id, &window_axis, hi)?;
        if metric_at_hi <= base_metric + self.metric_tolerance {
            self.state = SolverState::Converged(hi);
            return Ok(hi);
        }

        let mut lo = 0.0;
        let mut iteration = 0;
        while hi - lo > self.precision {
            if iteration >= self.max_iterations {
                let estimate = 0.5 * (lo + hi);
                self.state = SolverState::Exhausted(estimate);
                warn!(
                    estimate,
                    lo, hi, iteration, "bisection exhausted its iteration budget"
                );
                return Err(RpraError::SolverDidNotConverge {
                    estimate,
                    lo,
                    hi,
                    iterations: iteration,
                });
            }
            self.state = SolverState::Bisecting { lo, hi, iteration };
            let mid = 0.5 * (lo + hi);
            let metric = self.run_with_added_demand(&combined, probe_id, &window_axis, mid)?;
            debug!(iteration, lo, hi, mid, metric, "bisection step");
            if metric > base_metric + self.metric_tolerance {
                hi = mid;
            } else if metric < base_metric - self.metric_tolerance {
                lo = mid;
            } else {
                self.state = SolverState::Converged(mid);
                return Ok(mid);
            }
            iteration += 1;
        }

        let value = 0.5 * (lo + hi);
        self.state = SolverState::Converged(value);
        Ok(value)
    }

    /// Run the combined system plus a constant probe demand, recording the
    /// resulting matrix, and reduce it to the solver's metric.
    fn run_with_added_demand(
        &mut self,
        combined: &EnergySystem,
        probe_id: UnitId,
        window_axis: &Arc<TimeAxis>,
        added_demand: f64,
    ) -> RpraResult<f64> {
        let mut builder = EnergySystemBuilder::from_system(combined);
        if added_demand > 0.0 {
            let profile = Timeseries::constant(added_demand, window_axis.clone());
            builder.add_unit(DemandUnit::new(probe_id, profile)?)?;
        }
        let mut simulation = ProbabilisticSimulation::new(self.config)?;
        simulation.assign_energy_system(Arc::new(builder.build()));
        simulation.run()?;
        let metric = self.metric.compute(&simulation)?;
        let matrix = simulation.net_hourly_capacity_matrix()?.clone();
        self.intermediate.push((added_demand, matrix));
        Ok(metric)
    }
}
