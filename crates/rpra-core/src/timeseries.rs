//! Hourly time-indexed array primitives.
//!
//! Every series that participates in a simulation lives on a strictly
//! increasing hour grid. The simulator restricts itself to the intersection
//! of the configured window with the grid of every series, so the only
//! alignment operation needed is a nearest-neighbour lookup of a timestamp
//! on an axis.
//!
//! Timestamps are plain hours since an arbitrary UTC epoch. Calendar days
//! are 24-hour blocks of that epoch, which is what the loss-of-load-days
//! metric groups by.

use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scalar type used for all capacity, demand and energy values.
pub type FloatValue = f64;

/// A point in time, expressed in hours since an arbitrary UTC epoch.
pub type Time = f64;

/// Number of hours in a calendar day.
pub const HOURS_PER_DAY: Time = 24.0;

/// Tolerance when matching a timestamp against a grid point.
const GRID_TOLERANCE: Time = 1e-6;

/// A strictly increasing sequence of timestamps at one-hour spacing.
///
/// Axes are shared between series (and the net-capacity matrix) via [`Arc`],
/// so cloning a series never copies its grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    values: Array1<Time>,
}

impl TimeAxis {
    /// Create a time axis from explicit hour values.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty, contains a non-finite entry, or is not
    /// spaced at exactly one hour.
    pub fn from_values(values: Array1<Time>) -> Self {
        assert!(!values.is_empty(), "a time axis cannot be empty");
        assert!(
            values.iter().all(|v| v.is_finite()),
            "time axis values must be finite"
        );
        for pair in values.windows(2) {
            assert!(
                (pair[1] - pair[0] - 1.0).abs() <= GRID_TOLERANCE,
                "time axis must be hourly: found step {} between {} and {}",
                pair[1] - pair[0],
                pair[0],
                pair[1]
            );
        }
        Self { values }
    }

    /// Create an axis of `len` consecutive hours starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn hourly(start: Time, len: usize) -> Self {
        assert!(len > 0, "a time axis cannot be empty");
        Self {
            values: Array1::from_iter((0..len).map(|i| start + i as Time)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &Array1<Time> {
        &self.values
    }

    pub fn first(&self) -> Time {
        self.values[0]
    }

    pub fn last(&self) -> Time {
        self.values[self.values.len() - 1]
    }

    /// Half-open bounds `[first, last + 1)` covered by this axis.
    pub fn bounds(&self) -> (Time, Time) {
        (self.first(), self.last() + 1.0)
    }

    /// Index of the grid point matching `time`, or `None` when `time` is
    /// outside the axis or offset from the hour grid.
    pub fn index_of(&self, time: Time) -> Option<usize> {
        let offset = time - self.first();
        if offset < -GRID_TOLERANCE {
            return None;
        }
        let index = offset.round() as usize;
        if index < self.len() && (self.values[index] - time).abs() <= GRID_TOLERANCE {
            Some(index)
        } else {
            None
        }
    }
}

/// A finite hourly series of float values on a shared [`TimeAxis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    values: Array1<FloatValue>,
    time_axis: Arc<TimeAxis>,
}

impl Timeseries {
    /// Create a timeseries from values on an existing axis.
    ///
    /// # Panics
    ///
    /// Panics if the value and axis lengths differ.
    pub fn new(values: Array1<FloatValue>, time_axis: Arc<TimeAxis>) -> Self {
        assert_eq!(
            values.len(),
            time_axis.len(),
            "timeseries values and time axis must have the same length"
        );
        Self { values, time_axis }
    }

    /// Create a timeseries from a value array and a matching hour array.
    pub fn from_values(values: Array1<FloatValue>, times: Array1<Time>) -> Self {
        Self::new(values, Arc::new(TimeAxis::from_values(times)))
    }

    /// A series holding `value` at every hour of `time_axis`.
    pub fn constant(value: FloatValue, time_axis: Arc<TimeAxis>) -> Self {
        Self {
            values: Array1::from_elem(time_axis.len(), value),
            time_axis,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &Array1<FloatValue> {
        &self.values
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    /// Value at `time`, or `None` when `time` is off this series' grid.
    pub fn at_time(&self, time: Time) -> Option<FloatValue> {
        self.time_axis.index_of(time).map(|i| self.values[i])
    }

    /// Largest value of the series.
    pub fn peak(&self) -> FloatValue {
        self.values.iter().fold(FloatValue::NEG_INFINITY, |acc, v| acc.max(*v))
    }

    /// View of `hours` consecutive values starting at `start`, or `None`
    /// when the window is not fully covered by this series' grid.
    pub fn window_values(&self, start: Time, hours: usize) -> Option<ArrayView1<'_, FloatValue>> {
        let index = self.time_axis.index_of(start)?;
        if index + hours <= self.len() {
            Some(self.values.slice(s![index..index + hours]))
        } else {
            None
        }
    }
}

/// Dense net hourly capacity on (hour x trial) axes.
///
/// Values are megawatts. Negative entries are shortfalls, positive entries
/// surplus; exact zero sits on the adequacy boundary and is not a shortfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityMatrix {
    values: Array2<FloatValue>,
    time_axis: Arc<TimeAxis>,
}

impl CapacityMatrix {
    /// An all-zero matrix over `time_axis` with `trials` trial columns.
    pub fn zeros(time_axis: Arc<TimeAxis>, trials: usize) -> Self {
        Self {
            values: Array2::zeros((time_axis.len(), trials)),
            time_axis,
        }
    }

    /// Assemble a matrix from per-trial columns.
    ///
    /// # Panics
    ///
    /// Panics if any column's length differs from the axis length.
    pub fn from_columns(time_axis: Arc<TimeAxis>, columns: &[Array1<FloatValue>]) -> Self {
        let mut matrix = Self::zeros(time_axis, columns.len());
        for (trial, column) in columns.iter().enumerate() {
            matrix.values.column_mut(trial).assign(column);
        }
        matrix
    }

    pub fn num_hours(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_trials(&self) -> usize {
        self.values.ncols()
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    /// One trial's hourly net-capacity profile.
    pub fn trial(&self, trial: usize) -> ArrayView1<'_, FloatValue> {
        self.values.column(trial)
    }
}
