use legion::system;
use legion::Resources;
use log::debug;
use nalgebra::Vector3;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationData {
    pub time: f64,
    pub next_time: f64,
    pub last_simulated: i64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub time_delta: f64,
    pub gravity: Vector3<f32>,
    /// Minimum wall-clock milliseconds per tick. Zero runs unpaced.
    pub frame_time_cap: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            time_delta: 0.02,
            gravity: Vector3::new(0., -9.8, 0.),
            frame_time_cap: 0,
        }
    }
}

pub fn init_simulation(resources: &mut Resources, simulation_config: SimulationConfig) {
    resources.insert(SimulationData {
        time: 0.0,
        next_time: simulation_config.time_delta,
        last_simulated: now_millis(),
    });
    resources.insert(simulation_config);
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[system]
pub fn advance_time(
    #[resource] simulation_data: &mut SimulationData,
    #[resource] simulation_config: &SimulationConfig,
) {
    simulation_data.time = simulation_data.next_time;
    simulation_data.next_time += simulation_config.time_delta;
    let current_time = now_millis();
    debug!(
        "Tick time: {}",
        current_time - simulation_data.last_simulated
    );
    let ms_to_sleep = std::cmp::max(
        0,
        simulation_config.frame_time_cap - (current_time - simulation_data.last_simulated),
    ) as u64;
    if ms_to_sleep > 0 {
        std::thread::sleep(Duration::from_millis(ms_to_sleep));
    }
    simulation_data.last_simulated = current_time + (ms_to_sleep as i64);
}
