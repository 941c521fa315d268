pub mod advance;
pub mod ball;
pub mod court;
pub mod flight;
pub mod landing;
pub mod launcher;
pub mod marker;
pub mod preview;
pub mod simulation;
pub mod world_gen;

use legion::{Resources, Schedule, World};
use log::info;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use simulation::SimulationConfig;

/// Simulated length of one training session, seconds.
const SESSION_SECONDS: f64 = 60.;

fn init_logging() {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} {l} {t} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .unwrap();
    log4rs::init_config(config).unwrap();
}

pub fn main() {
    init_logging();

    // Initialize world.
    let mut world = World::default();
    let mut resources = Resources::default();
    let simulation_config = SimulationConfig::default();
    simulation::init_simulation(&mut resources, simulation_config);
    world_gen::init_resources(&mut resources);

    // Initialize scheduler. One tick owns all state mutation; detectors only
    // observe what the integrator produced earlier in the same tick.
    let mut schedule = Schedule::builder()
        .add_system(launcher::serve_system())
        .flush()
        .add_system(advance::advance_balls_system())
        .add_system(preview::refresh_preview_system())
        .add_system(landing::detect_landings_system())
        .add_system(marker::spawn_impact_markers_system())
        .flush()
        .add_system(marker::update_impact_markers_system())
        .add_system(flight::track_flight_times_system())
        .add_system(advance::retire_balls_system())
        .flush()
        .add_system(simulation::advance_time_system())
        .build();

    let ticks = (SESSION_SECONDS / simulation_config.time_delta).round() as u64;
    for _ in 0..ticks {
        schedule.execute(&mut world, &mut resources);
    }

    let flight_data = resources.get::<flight::FlightTimeData>().unwrap();
    let stats = flight_data.stats();
    info!(
        "Session done: {} flights on record, min {:.2}s, max {:.2}s, mean {:.2}s",
        stats.count, stats.min, stats.max, stats.mean
    );
}
