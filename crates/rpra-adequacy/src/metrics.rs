//! Adequacy metrics: reductions of the net-capacity matrix to scalars.
//!
//! Every metric is an expectation per study horizon, averaged over trials.
//! Shortfall is strictly negative net capacity; an exact zero sits on the
//! boundary and counts as served. Arithmetic is 64-bit float throughout,
//! and a non-finite matrix entry is an error rather than silently zero.

use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use rpra_core::errors::{RpraError, RpraResult};
use rpra_core::simulation::ProbabilisticSimulation;
use rpra_core::timeseries::{CapacityMatrix, Time, HOURS_PER_DAY};

/// The four adequacy metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Expected unserved energy, MWh per study horizon.
    ExpectedUnservedEnergy,
    /// Expected count of shortfall hours per study horizon.
    LossOfLoadHours,
    /// Expected count of calendar days containing a shortfall hour.
    LossOfLoadDays,
    /// Expected count of maximal runs of consecutive shortfall hours.
    LossOfLoadFrequency,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::ExpectedUnservedEnergy => "EUE",
            MetricKind::LossOfLoadHours => "LOLH",
            MetricKind::LossOfLoadDays => "LOLD",
            MetricKind::LossOfLoadFrequency => "LOLF",
        };
        write!(f, "{}", name)
    }
}

impl MetricKind {
    /// Reduce an already-run simulation to this metric's scalar.
    pub fn compute(&self, simulation: &ProbabilisticSimulation) -> RpraResult<f64> {
        compute_metric(*self, simulation.net_hourly_capacity_matrix()?)
    }
}

/// Reduce a net-capacity matrix to one metric.
///
/// A matrix with no trials reduces to 0 for every metric.
pub fn compute_metric(kind: MetricKind, matrix: &CapacityMatrix) -> RpraResult<f64> {
    ensure_finite(matrix)?;
    let trials = matrix.num_trials();
    if trials == 0 {
        return Ok(0.0);
    }
    let times = matrix.time_axis().values();
    let total: f64 = matrix
        .values()
        .axis_iter(Axis(1))
        .map(|trial| match kind {
            MetricKind::ExpectedUnservedEnergy => unserved_energy(&trial),
            MetricKind::LossOfLoadHours => shortfall_hours(&trial) as f64,
            MetricKind::LossOfLoadDays => shortfall_days(&trial, times) as f64,
            MetricKind::LossOfLoadFrequency => shortfall_events(&trial) as f64,
        })
        .sum();
    Ok(total / trials as f64)
}

fn ensure_finite(matrix: &CapacityMatrix) -> RpraResult<()> {
    for ((time_index, trial), value) in matrix.values().indexed_iter() {
        if !value.is_finite() {
            return Err(RpraError::NonFiniteNetCapacity { time_index, trial });
        }
    }
    Ok(())
}

fn unserved_energy(trial: &ArrayView1<'_, f64>) -> f64 {
    trial.iter().map(|v| (-v).max(0.0)).sum()
}

fn shortfall_hours(trial: &ArrayView1<'_, f64>) -> usize {
    trial.iter().filter(|v| **v < 0.0).count()
}

/// Count calendar days (24-hour UTC blocks) containing at least one
/// shortfall hour. Times are ascending, so days arrive in order and a
/// running marker suffices.
fn shortfall_days(trial: &ArrayView1<'_, f64>, times: &Array1<Time>) -> usize {
    let mut days = 0;
    let mut last_day: Option<i64> = None;
    for (value, time) in trial.iter().zip(times.iter()) {
        if *value < 0.0 {
            let day = (time / HOURS_PER_DAY).floor() as i64;
            if last_day != Some(day) {
                days += 1;
                last_day = Some(day);
            }
        }
    }
    days
}

/// Count maximal runs of consecutive shortfall hours.
fn shortfall_events(trial: &ArrayView1<'_, f64>) -> usize {
    let mut events = 0;
    let mut in_event = false;
    for value in trial.iter() {
        let short = *value < 0.0;
        if short && !in_event {
            events += 1;
        }
        in_event = short;
    }
    events
}

/// All four metrics of one run, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdequacyReport {
    /// Expected unserved energy (MWh).
    pub expected_unserved_energy_mwh: f64,
    /// Expected shortfall hours (h).
    pub loss_of_load_hours: f64,
    /// Expected shortfall days (d).
    pub loss_of_load_days: f64,
    /// Expected shortfall events (#).
    pub loss_of_load_frequency: f64,
}

impl AdequacyReport {
    /// Compute the full report from an already-run simulation.
    pub fn from_simulation(simulation: &ProbabilisticSimulation) -> RpraResult<Self> {
        let matrix = simulation.net_hourly_capacity_matrix()?;
        ensure_finite(matrix)?;
        let trials = matrix.num_trials();
        if trials == 0 {
            return Ok(Self {
                expected_unserved_energy_mwh: 0.0,
                loss_of_load_hours: 0.0,
                loss_of_load_days: 0.0,
                loss_of_load_frequency: 0.0,
            });
        }
        let times = matrix.time_axis().values();
        let mut energy = 0.0;
        let mut hours = 0usize;
        let mut days = 0usize;
        let mut events = 0usize;
        for trial in matrix.values().axis_iter(Axis(1)) {
            energy += unserved_energy(&trial);
            hours += shortfall_hours(&trial);
            days += shortfall_days(&trial, times);
            events += shortfall_events(&trial);
        }
        let n = trials as f64;
        Ok(Self {
            expected_unserved_energy_mwh: energy / n,
            loss_of_load_hours: hours as f64 / n,
            loss_of_load_days: days as f64 / n,
            loss_of_load_frequency: events as f64 / n,
        })
    }
}

impl fmt::Display for AdequacyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Adequacy Report ---")?;
        writeln!(f, "EUE:  {:.3} MWh", self.expected_unserved_energy_mwh)?;
        writeln!(f, "LOLH: {:.3} h", self.loss_of_load_hours)?;
        writeln!(f, "LOLD: {:.3} d", self.loss_of_load_days)?;
        write!(f, "LOLF: {:.3} events", self.loss_of_load_frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{array, Array1};
    use rpra_core::timeseries::TimeAxis;
    use std::sync::Arc;

    fn single_trial(values: Array1<f64>, start: Time) -> CapacityMatrix {
        let axis = Arc::new(TimeAxis::hourly(start, values.len()));
        CapacityMatrix::from_columns(axis, &[values])
    }

    #[test]
    fn unserved_energy_ignores_surplus_and_zero() {
        let matrix = single_trial(array![5.0, 0.0, -3.0, -2.0, 1.0], 0.0);
        let eue = compute_metric(MetricKind::ExpectedUnservedEnergy, &matrix).unwrap();
        assert!(is_close!(eue, 5.0));
    }

    #[test]
    fn zero_is_not_a_shortfall() {
        let matrix = single_trial(array![0.0, 0.0, 0.0], 0.0);
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadHours, &matrix).unwrap(),
            0.0
        );
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadFrequency, &matrix).unwrap(),
            0.0
        );
    }

    #[test]
    fn event_segmentation_counts_maximal_runs() {
        // Shortfalls at hours {3, 4, 5, 9, 10}: five hours in two events.
        let mut values = Array1::from_elem(12, 10.0);
        for h in [3, 4, 5, 9, 10] {
            values[h] = -1.0;
        }
        let matrix = single_trial(values, 0.0);
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadHours, &matrix).unwrap(),
            5.0
        );
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadFrequency, &matrix).unwrap(),
            2.0
        );
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadDays, &matrix).unwrap(),
            1.0
        );
    }

    #[test]
    fn day_grouping_splits_on_midnight() {
        // Two shortfall hours straddling the day boundary at hour 24.
        let mut values = Array1::from_elem(4, 10.0);
        values[1] = -1.0;
        values[2] = -1.0;
        let matrix = single_trial(values, 22.0);
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadDays, &matrix).unwrap(),
            2.0
        );
        // One contiguous run regardless of the day split.
        assert_eq!(
            compute_metric(MetricKind::LossOfLoadFrequency, &matrix).unwrap(),
            1.0
        );
    }

    #[test]
    fn metrics_average_over_trials() {
        let axis = Arc::new(TimeAxis::hourly(0.0, 3));
        let matrix = CapacityMatrix::from_columns(
            axis,
            &[array![-2.0, 1.0, 1.0], array![1.0, 1.0, 1.0]],
        );
        let eue = compute_metric(MetricKind::ExpectedUnservedEnergy, &matrix).unwrap();
        assert!(is_close!(eue, 1.0));
        let lolh = compute_metric(MetricKind::LossOfLoadHours, &matrix).unwrap();
        assert!(is_close!(lolh, 0.5));
    }

    #[test]
    fn zero_trials_reduce_to_zero() {
        let axis = Arc::new(TimeAxis::hourly(0.0, 5));
        let matrix = CapacityMatrix::zeros(axis, 0);
        assert_eq!(
            compute_metric(MetricKind::ExpectedUnservedEnergy, &matrix).unwrap(),
            0.0
        );
    }

    #[test]
    fn report_renders_all_four_metrics() {
        let report = AdequacyReport {
            expected_unserved_energy_mwh: 12.5,
            loss_of_load_hours: 3.0,
            loss_of_load_days: 1.0,
            loss_of_load_frequency: 2.0,
        };
        let rendered = report.to_string();
        assert!(rendered.contains("EUE:  12.500 MWh"));
        assert!(rendered.contains("LOLF: 2.000 events"));
    }

    #[test]
    fn non_finite_entries_are_an_error() {
        let matrix = single_trial(array![1.0, f64::NAN, 1.0], 0.0);
        assert!(matches!(
            compute_metric(MetricKind::ExpectedUnservedEnergy, &matrix),
            Err(RpraError::NonFiniteNetCapacity {
                time_index: 1,
                trial: 0
            })
        ));
    }
}
