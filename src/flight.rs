use std::collections::VecDeque;

use fnv::{FnvHashMap, FnvHashSet};
use legion::world::SubWorld;
use legion::{system, Entity, IntoQuery};
use log::info;

use crate::ball::Ball;
use crate::simulation::SimulationData;

/// Flight-timer knobs. A deliberately coarser lifecycle than landing
/// detection, and fully separate from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightTimeConfig {
    /// Timing starts above this speed and stops back under it.
    pub min_tracking_speed: f32,
    /// Under this height the flight is over even at speed.
    pub floor_height: f32,
    /// Flights are cut off and recorded once they run this long.
    pub max_flight_duration: f64,
    /// Rolling-history capacity; the oldest record is evicted beyond it.
    pub history_limit: usize,
}

impl Default for FlightTimeConfig {
    fn default() -> Self {
        FlightTimeConfig {
            min_tracking_speed: 1.5,
            floor_height: 0.1,
            max_flight_duration: 15.,
            history_limit: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightRecord {
    pub duration: f64,
    pub time: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlightStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

/// Per-body start times plus the bounded rolling history.
#[derive(Default)]
pub struct FlightTimeData {
    active: FnvHashMap<Entity, f64>,
    pub history: VecDeque<FlightRecord>,
}

impl FlightTimeData {
    /// Feed one observation; returns the record when it stops a flight.
    pub fn observe(
        &mut self,
        entity: Entity,
        ball: &Ball,
        now: f64,
        config: &FlightTimeConfig,
    ) -> Option<FlightRecord> {
        let speed = ball.speed();
        let start = match self.active.get(&entity) {
            None => {
                if speed > config.min_tracking_speed && ball.position.y >= config.floor_height {
                    self.active.insert(entity, now);
                }
                return None;
            }
            Some(&start) => start,
        };
        let elapsed = now - start;
        let done = speed < config.min_tracking_speed
            || ball.position.y < config.floor_height
            || elapsed > config.max_flight_duration;
        if !done {
            return None;
        }
        self.active.remove(&entity);
        let record = FlightRecord {
            duration: elapsed,
            time: now,
        };
        self.push_record(record, config.history_limit);
        Some(record)
    }

    fn push_record(&mut self, record: FlightRecord, limit: usize) {
        while self.history.len() >= limit.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// One linear pass over the history; recomputed on demand, nothing
    /// cached.
    pub fn stats(&self) -> FlightStats {
        let mut stats = FlightStats::default();
        for record in &self.history {
            if stats.count == 0 || record.duration < stats.min {
                stats.min = record.duration;
            }
            if stats.count == 0 || record.duration > stats.max {
                stats.max = record.duration;
            }
            stats.sum += record.duration;
            stats.count += 1;
        }
        if stats.count > 0 {
            stats.mean = stats.sum / stats.count as f64;
        }
        stats
    }

    /// Forget bodies that no longer exist; mid-flight despawns leave no
    /// record.
    pub fn retain_alive(&mut self, alive: &FnvHashSet<Entity>) {
        self.active.retain(|entity, _| alive.contains(entity));
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[system]
#[read_component(Ball)]
pub fn track_flight_times(
    world: &mut SubWorld,
    #[resource] data: &mut FlightTimeData,
    #[resource] config: &FlightTimeConfig,
    #[resource] simulation_data: &SimulationData,
) {
    let mut alive = FnvHashSet::default();
    for (entity, ball) in <(Entity, &Ball)>::query().iter(world) {
        alive.insert(*entity);
        if let Some(record) = data.observe(*entity, ball, simulation_data.time, config) {
            info!(
                "Flight of {:?} lasted {:.2}s ({} on record)",
                entity,
                record.duration,
                data.history.len()
            );
        }
    }
    data.retain_alive(&alive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::BALL_RADIUS;
    use approx::assert_relative_eq;
    use legion::World;
    use nalgebra::Vector3;

    fn ball(height: f32, speed: f32) -> Ball {
        Ball {
            position: Vector3::new(0., height, 0.),
            velocity: Vector3::new(speed, 0., 0.),
            radius: BALL_RADIUS,
        }
    }

    fn body() -> Entity {
        let mut world = World::default();
        world.push((0usize,))
    }

    #[test]
    fn flight_is_timed_from_first_fast_observation() {
        let mut data = FlightTimeData::default();
        let entity = body();
        let config = FlightTimeConfig::default();
        assert!(data.observe(entity, &ball(1., 8.), 1.0, &config).is_none());
        assert!(data.observe(entity, &ball(2., 8.), 1.5, &config).is_none());
        // Drops under the floor: flight over.
        let record = data
            .observe(entity, &ball(0.05, 8.), 2.2, &config)
            .expect("low pass should stop the clock");
        assert_relative_eq!(record.duration, 1.2, epsilon = 1e-9);
        assert_relative_eq!(record.time, 2.2, epsilon = 1e-9);
    }

    #[test]
    fn slowing_down_stops_the_clock() {
        let mut data = FlightTimeData::default();
        let entity = body();
        let config = FlightTimeConfig::default();
        data.observe(entity, &ball(1., 8.), 0., &config);
        let record = data.observe(entity, &ball(1., 0.5), 0.8, &config).unwrap();
        assert_relative_eq!(record.duration, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn runaway_flight_is_cut_off() {
        let mut data = FlightTimeData::default();
        let entity = body();
        let config = FlightTimeConfig::default();
        data.observe(entity, &ball(5., 8.), 0., &config);
        assert!(data.observe(entity, &ball(5., 8.), 10., &config).is_none());
        let record = data.observe(entity, &ball(5., 8.), 15.1, &config).unwrap();
        assert_relative_eq!(record.duration, 15.1, epsilon = 1e-9);
    }

    #[test]
    fn slow_or_grounded_bodies_never_start_the_clock() {
        let mut data = FlightTimeData::default();
        let config = FlightTimeConfig::default();
        data.observe(body(), &ball(1., 1.), 0., &config);
        data.observe(body(), &ball(0.05, 8.), 0., &config);
        assert_eq!(data.active_count(), 0);
    }

    #[test]
    fn history_evicts_exactly_the_oldest() {
        let mut data = FlightTimeData::default();
        for index in 0..10 {
            data.push_record(
                FlightRecord {
                    duration: index as f64,
                    time: index as f64,
                },
                4,
            );
            assert!(data.history.len() <= 4);
        }
        let kept: Vec<f64> = data.history.iter().map(|record| record.duration).collect();
        assert_eq!(kept, vec![6., 7., 8., 9.]);
    }

    #[test]
    fn stats_are_a_single_pass_over_the_history() {
        let mut data = FlightTimeData::default();
        for duration in &[2., 4., 9.] {
            data.push_record(
                FlightRecord {
                    duration: *duration,
                    time: 0.,
                },
                64,
            );
        }
        let stats = data.stats();
        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.min, 2., epsilon = 1e-9);
        assert_relative_eq!(stats.max, 9., epsilon = 1e-9);
        assert_relative_eq!(stats.sum, 15., epsilon = 1e-9);
        assert_relative_eq!(stats.mean, 5., epsilon = 1e-9);
    }

    #[test]
    fn empty_history_yields_zeroed_stats() {
        assert_eq!(FlightTimeData::default().stats(), FlightStats::default());
    }
}
