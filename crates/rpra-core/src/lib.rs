//! Core building blocks for probabilistic resource-adequacy studies.
//!
//! The crate models a bulk power system as a population of demand, static,
//! stochastic and storage units, and synthesizes Monte Carlo trials of its
//! net hourly capacity. Downstream crates reduce the resulting matrix into
//! adequacy metrics and capacity-contribution values.

pub mod errors;
pub mod persistence;
mod rng;
pub mod simulation;
pub mod system;
pub mod timeseries;
pub mod unit;
