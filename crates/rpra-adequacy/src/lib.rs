//! Adequacy metrics and capacity-credit analysis for rpra simulations.
//!
//! [`metrics`] reduces a simulated net-capacity matrix to the standard
//! adequacy scalars (EUE, LOLH, LOLD, LOLF); [`elcc`] searches for the
//! effective load-carrying capability of a resource addition by bisecting
//! over added constant demand with seed-paired simulations.

pub mod elcc;
pub mod metrics;
