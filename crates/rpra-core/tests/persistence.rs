//! Round-trip persistence: a restored system must simulate identically.

use ndarray::Array1;
use std::sync::Arc;

use rpra_core::simulation::{ProbabilisticSimulation, SimulationConfig};
use rpra_core::system::{EnergySystem, EnergySystemBuilder};
use rpra_core::timeseries::{TimeAxis, Timeseries};
use rpra_core::unit::{DemandUnit, StaticUnit, StochasticUnit, StorageUnit};

fn build_system() -> EnergySystem {
    let time_axis = Arc::new(TimeAxis::hourly(8760.0, 168));
    let demand = Timeseries::new(
        Array1::from_iter((0..168).map(|h| 140.0 + 35.0 * (h as f64 / 12.0).sin())),
        time_axis.clone(),
    );
    let wind = Timeseries::new(
        Array1::from_iter((0..168).map(|h| 45.0 + 20.0 * (h as f64 / 7.0).cos())),
        time_axis.clone(),
    );
    let mut builder = EnergySystemBuilder::new();
    builder.add_unit(DemandUnit::new(0, demand).unwrap()).unwrap();
    builder
        .add_unit(
            StaticUnit::new(1, 90.0, Timeseries::constant(90.0, time_axis.clone())).unwrap(),
        )
        .unwrap();
    builder
        .add_unit(
            StochasticUnit::new(2, 65.0, wind, Timeseries::constant(0.12, time_axis)).unwrap(),
        )
        .unwrap();
    builder
        .add_unit(StorageUnit::new(3, 50.0, 50.0, 50.0, 200.0, 0.88).unwrap())
        .unwrap();
    builder.build()
}

fn simulate(system: EnergySystem) -> rpra_core::timeseries::CapacityMatrix {
    let mut simulation = ProbabilisticSimulation::new(SimulationConfig {
        start_hour: 8760.0,
        end_hour: 8760.0 + 168.0,
        trial_size: 30,
        seed: Some(314159),
    })
    .unwrap();
    simulation.assign_energy_system(Arc::new(system));
    simulation.run().unwrap();
    simulation.net_hourly_capacity_matrix().unwrap().clone()
}

#[test]
fn restored_system_simulates_bitwise_identically() {
    let dir = tempfile::tempdir().unwrap();
    let system = build_system();
    system.save(dir.path()).unwrap();

    let restored = EnergySystem::load(dir.path()).unwrap();
    assert_eq!(system, restored);
    assert_eq!(simulate(system), simulate(restored));
}
