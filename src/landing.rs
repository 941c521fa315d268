use fnv::{FnvHashMap, FnvHashSet};
use legion::world::SubWorld;
use legion::{system, Entity, IntoQuery};
use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::ball::Ball;
use crate::court::{CourtScene, SurfaceKind, SurfaceQuery};
use crate::simulation::SimulationData;

/// Landing-detection thresholds. Tuned against the live integrator; the
/// check order below is load-bearing, so renumbering the checks changes
/// behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandingConfig {
    /// Speed a body must exceed before it is tracked at all.
    pub min_tracking_speed: f32,
    /// Heights at or under this count as at the court.
    pub ground_proximity: f32,
    /// Vertical-velocity ceiling near the court: any descent qualifies, a
    /// body climbing faster than this does not.
    pub settle_velocity: f32,
    /// Widens ground_proximity for the ray-confirmed check.
    pub ray_band: f32,
    /// How far below the body the confirmation ray probes.
    pub ray_probe_distance: f32,
    /// Under this height the body has likely tunneled through the court.
    pub forced_low_height: f32,
    /// Looser overall-speed cap paired with forced_low_height.
    pub forced_low_speed: f32,
    /// Tunneled landings are reported at this height.
    pub snap_height: f32,
    /// At or under this height the body has landed no matter its velocity.
    pub rest_height: f32,
    /// Sanity bounds; outside them the feed is treated as corrupt and the
    /// tracking entry dropped without an event.
    pub min_sane_height: f32,
    pub max_sane_speed: f32,
    pub play_area_bound: f32,
}

impl Default for LandingConfig {
    fn default() -> Self {
        LandingConfig {
            min_tracking_speed: 1.5,
            ground_proximity: 0.5,
            settle_velocity: 0.5,
            ray_band: 1.5,
            ray_probe_distance: 1.0,
            forced_low_height: 0.15,
            forced_low_speed: 2.5,
            snap_height: 0.02,
            rest_height: 0.05,
            min_sane_height: -25.,
            max_sane_speed: 150.,
            play_area_bound: 250.,
        }
    }
}

/// Emitted exactly once per tracked flight, at the moment of detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandingEvent {
    pub entity: Entity,
    pub position: Vector3<f32>,
    pub impact_speed: f32,
    pub impact_velocity: Vector3<f32>,
    pub time: f64,
}

/// Which of the escalating checks fired; logged for threshold tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandingCheck {
    NearGround,
    RayConfirmed,
    ForcedLow,
    LastResort,
}

#[derive(Clone, Copy, Debug, Default)]
struct TrackedFlight {
    landed: bool,
}

/// Per-body landing bookkeeping plus the outgoing event queue. Every
/// consumer of the body feed keeps its own map; nothing here is shared with
/// the flight timer or the marker layer.
#[derive(Default)]
pub struct LandingDetectionData {
    tracked: FnvHashMap<Entity, TrackedFlight>,
    pub events: Vec<LandingEvent>,
}

impl LandingDetectionData {
    /// Feed one body observation. Returns the landing event when this
    /// observation completes the body's flight.
    pub fn observe<Q: SurfaceQuery>(
        &mut self,
        entity: Entity,
        ball: &Ball,
        time: f64,
        config: &LandingConfig,
        query: &Q,
    ) -> Option<LandingEvent> {
        let speed = ball.speed();
        if ball.position.y < config.min_sane_height
            || speed > config.max_sane_speed
            || ball.position.x.abs() > config.play_area_bound
            || ball.position.z.abs() > config.play_area_bound
        {
            // Known physics-engine edge cases produce these; drop quietly
            // rather than let one bad body stall the loop.
            if self.tracked.remove(&entity).is_some() {
                warn!(
                    "Dropping corrupt body {:?}: position {:?}, speed {:.1}",
                    entity, ball.position, speed
                );
            }
            return None;
        }
        if !self.tracked.contains_key(&entity) {
            if speed <= config.min_tracking_speed {
                return None;
            }
            self.tracked.insert(entity, TrackedFlight::default());
            debug!("Tracking {:?} at speed {:.2}", entity, speed);
        }
        if self.tracked[&entity].landed {
            // Flight already over. The entry lingers until the body slows
            // back down, which is what forces a fresh launch before the same
            // body can land again.
            if speed < config.min_tracking_speed {
                self.tracked.remove(&entity);
            }
            return None;
        }
        let (position, check) = evaluate_landing(ball, config, query)?;
        if let Some(flight) = self.tracked.get_mut(&entity) {
            flight.landed = true;
        }
        let event = LandingEvent {
            entity,
            position,
            impact_speed: speed,
            impact_velocity: ball.velocity,
            time,
        };
        info!(
            "Landing ({:?}) {:?} at ({:.2}, {:.2}, {:.2}), impact speed {:.2}",
            check, entity, position.x, position.y, position.z, speed
        );
        self.events.push(event);
        Some(event)
    }

    /// Forget bodies that no longer exist.
    pub fn retain_alive(&mut self, alive: &FnvHashSet<Entity>) {
        self.tracked.retain(|entity, _| alive.contains(entity));
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

/// The escalating landing checks in priority order, first match wins. Each
/// is looser than the one before it, to tolerate discretization and
/// tunneling as impact speed grows.
fn evaluate_landing<Q: SurfaceQuery>(
    ball: &Ball,
    config: &LandingConfig,
    query: &Q,
) -> Option<(Vector3<f32>, LandingCheck)> {
    let height = ball.position.y;
    // 1. Near the court and not climbing away from it.
    if height <= config.ground_proximity && ball.velocity.y < config.settle_velocity {
        return Some((ball.position, LandingCheck::NearGround));
    }
    // 2. Slightly wider band, confirmed by a short downward probe. The ray
    // hit point beats the body position by up to a tick's worth of travel.
    if height <= config.ground_proximity * config.ray_band {
        if let Some(hit) = query.intersect(
            ball.position,
            Vector3::new(0., -1., 0.),
            config.ray_probe_distance,
        ) {
            if hit.kind == SurfaceKind::Court {
                return Some((hit.point, LandingCheck::RayConfirmed));
            }
        }
    }
    // 3. Sunk through the court at speed: snap back above the surface.
    if height < config.forced_low_height && ball.speed() < config.forced_low_speed {
        return Some((
            Vector3::new(ball.position.x, config.snap_height, ball.position.z),
            LandingCheck::ForcedLow,
        ));
    }
    // 4. Resting on the surface with whatever residual velocity survived
    // the earlier checks' windows.
    if height < config.rest_height {
        return Some((ball.position, LandingCheck::LastResort));
    }
    None
}

#[system]
#[read_component(Ball)]
pub fn detect_landings(
    world: &mut SubWorld,
    #[resource] data: &mut LandingDetectionData,
    #[resource] config: &LandingConfig,
    #[resource] scene: &CourtScene,
    #[resource] simulation_data: &SimulationData,
) {
    let mut alive = FnvHashSet::default();
    for (entity, ball) in <(Entity, &Ball)>::query().iter(world) {
        alive.insert(*entity);
        data.observe(*entity, ball, simulation_data.time, config, scene);
    }
    data.retain_alive(&alive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::BALL_RADIUS;
    use crate::court::{Surface, SurfaceHit};
    use approx::assert_relative_eq;
    use legion::World;

    /// Empty scene: the ray-confirmed check can never fire.
    struct Open;

    impl SurfaceQuery for Open {
        fn intersect(&self, _: Vector3<f32>, _: Vector3<f32>, _: f32) -> Option<SurfaceHit> {
            None
        }
    }

    fn court() -> CourtScene {
        CourtScene {
            surfaces: vec![Surface::Plane {
                height: 0.,
                kind: SurfaceKind::Court,
            }],
        }
    }

    fn ball(position: Vector3<f32>, velocity: Vector3<f32>) -> Ball {
        Ball {
            position,
            velocity,
            radius: BALL_RADIUS,
        }
    }

    fn body() -> Entity {
        // Any entity works as an identity; the detector never dereferences it.
        let mut world = World::default();
        world.push((0usize,))
    }

    #[test]
    fn descending_body_near_court_lands_at_its_position() {
        let mut data = LandingDetectionData::default();
        let observed = ball(Vector3::new(0., 0.05, 3.), Vector3::new(0., -3., 0.));
        let event = data
            .observe(body(), &observed, 1.0, &LandingConfig::default(), &Open)
            .expect("should land on first observation");
        assert_relative_eq!(event.impact_speed, 3.0, epsilon = 1e-6);
        assert_relative_eq!(event.position, observed.position, epsilon = 1e-6);
        assert_relative_eq!(event.impact_velocity, observed.velocity, epsilon = 1e-6);
    }

    #[test]
    fn one_event_per_flight_no_matter_how_many_checks_hold() {
        let mut data = LandingDetectionData::default();
        let entity = body();
        let config = LandingConfig::default();
        // Satisfies the near-ground, forced-low and last-resort conditions
        // at once, for many consecutive ticks.
        let observed = ball(Vector3::new(0., 0.01, 0.), Vector3::new(2., -0.1, 0.));
        for tick in 0..20 {
            data.observe(entity, &observed, tick as f64 * 0.02, &config, &court());
        }
        assert_eq!(data.events.len(), 1);
    }

    #[test]
    fn slow_body_is_never_tracked() {
        let mut data = LandingDetectionData::default();
        let observed = ball(Vector3::new(0., 0.05, 0.), Vector3::new(0., -1., 0.));
        assert!(data
            .observe(body(), &observed, 0., &LandingConfig::default(), &Open)
            .is_none());
        assert_eq!(data.tracked_count(), 0);
        assert!(data.events.is_empty());
    }

    #[test]
    fn ray_confirmation_lands_at_the_hit_point() {
        let mut data = LandingDetectionData::default();
        // Too high for the near-ground check, inside the widened band, and
        // the probe finds the court straight below.
        let observed = ball(Vector3::new(2., 0.6, 1.), Vector3::new(0., -2., 0.));
        let event = data
            .observe(body(), &observed, 0., &LandingConfig::default(), &court())
            .expect("probe should confirm the landing");
        assert_relative_eq!(event.position, Vector3::new(2., 0., 1.), epsilon = 1e-5);
    }

    #[test]
    fn tunneled_body_is_snapped_above_the_court() {
        let mut data = LandingDetectionData::default();
        // Below the court, climbing too fast for the near-ground check, and
        // the downward probe finds nothing from under the plane.
        let observed = ball(Vector3::new(1., -0.1, 2.), Vector3::new(0., 1.8, 0.));
        let event = data
            .observe(body(), &observed, 0., &LandingConfig::default(), &court())
            .expect("forced-low should fire");
        assert_relative_eq!(event.position, Vector3::new(1., 0.02, 2.), epsilon = 1e-6);
    }

    #[test]
    fn last_resort_catches_fast_risers_on_the_surface() {
        let mut data = LandingDetectionData::default();
        // Rising too fast for near-ground, no scene for the probe, too fast
        // for forced-low; only the height-only check is left.
        let observed = ball(Vector3::new(0., 0.04, 0.), Vector3::new(0., 3., 0.));
        let event = data
            .observe(body(), &observed, 0., &LandingConfig::default(), &Open)
            .expect("last-resort should fire");
        assert_relative_eq!(event.position, observed.position, epsilon = 1e-6);
    }

    #[test]
    fn airborne_body_above_every_band_does_not_land() {
        let mut data = LandingDetectionData::default();
        let observed = ball(Vector3::new(0., 3., 0.), Vector3::new(0., -5., 4.));
        assert!(data
            .observe(body(), &observed, 0., &LandingConfig::default(), &court())
            .is_none());
        assert_eq!(data.tracked_count(), 1);
    }

    #[test]
    fn corrupt_feed_drops_the_entry_without_an_event() {
        let mut data = LandingDetectionData::default();
        let entity = body();
        let config = LandingConfig::default();
        let airborne = ball(Vector3::new(0., 3., 0.), Vector3::new(0., -5., 4.));
        data.observe(entity, &airborne, 0., &config, &court());
        assert_eq!(data.tracked_count(), 1);
        // The engine hiccups: the body teleports far underground.
        let corrupt = ball(Vector3::new(0., -100., 0.), Vector3::new(0., -5., 4.));
        assert!(data.observe(entity, &corrupt, 0.02, &config, &court()).is_none());
        assert_eq!(data.tracked_count(), 0);
        assert!(data.events.is_empty());
    }

    #[test]
    fn relanding_requires_a_fresh_launch() {
        let mut data = LandingDetectionData::default();
        let entity = body();
        let config = LandingConfig::default();
        let landing = ball(Vector3::new(0., 0.05, 0.), Vector3::new(0., -3., 0.));
        data.observe(entity, &landing, 0., &config, &court());
        assert_eq!(data.events.len(), 1);
        // Still fast: the finished flight lingers, no second event.
        data.observe(entity, &landing, 0.02, &config, &court());
        assert_eq!(data.events.len(), 1);
        // Slows to rest: entry retires.
        let rest = ball(Vector3::new(0., 0.03, 0.), Vector3::zeros());
        data.observe(entity, &rest, 0.04, &config, &court());
        assert_eq!(data.tracked_count(), 0);
        // Relaunched: a brand-new flight may land again.
        let relaunch = ball(Vector3::new(0., 0.4, 0.), Vector3::new(0., -4., 2.));
        data.observe(entity, &relaunch, 0.06, &config, &court());
        assert_eq!(data.events.len(), 2);
    }
}
