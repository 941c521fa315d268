use fnv::FnvHashSet;
use legion::systems::CommandBuffer;
use legion::world::SubWorld;
use legion::{system, Entity, IntoQuery};
use log::debug;
use nalgebra::Vector3;
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

use crate::landing::{LandingDetectionData, LandingEvent};
use crate::simulation::SimulationData;

/// Impact-ring knobs: size scaling, color banding, lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerConfig {
    pub base_size: f32,
    pub speed_scale: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Ascending impact-speed bounds of the first three color bands; faster
    /// impacts take the fourth.
    pub slow_speed: f32,
    pub medium_speed: f32,
    pub fast_speed: f32,
    /// Seconds a ring stays in the scene.
    pub lifetime: f64,
    /// Final fraction of the lifetime spent fading out. Zero disables.
    pub fade_fraction: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            base_size: 0.12,
            speed_scale: 0.02,
            min_size: 0.12,
            max_size: 0.5,
            slow_speed: 4.,
            medium_speed: 8.,
            fast_speed: 14.,
            lifetime: 6.,
            fade_fraction: 0.25,
        }
    }
}

/// A transient ring where a ball came down. Purely visual; nothing reads it
/// back into the physics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpactMarker {
    pub position: Vector3<f32>,
    pub size: f32,
    pub color: Vector3<f32>,
    pub opacity: f32,
    pub created_at: f64,
    pub lifetime: f64,
}

pub fn marker_from_event(event: &LandingEvent, config: &MarkerConfig, now: f64) -> ImpactMarker {
    ImpactMarker {
        position: event.position,
        size: (config.base_size + event.impact_speed * config.speed_scale)
            .clamp(config.min_size, config.max_size),
        color: band_color(event.impact_speed, config),
        opacity: 1.,
        created_at: now,
        lifetime: config.lifetime,
    }
}

/// Soft greens for drop shots through hot reds for flat smashes.
fn band_color(impact_speed: f32, config: &MarkerConfig) -> Vector3<f32> {
    if impact_speed <= config.slow_speed {
        Vector3::new(0.7, 0.9, 0.8)
    } else if impact_speed <= config.medium_speed {
        Vector3::new(0.9, 0.9, 0.6)
    } else if impact_speed <= config.fast_speed {
        Vector3::new(0.95, 0.6, 0.3)
    } else {
        Vector3::new(0.9, 0.2, 0.2)
    }
}

/// Opacity after `elapsed` seconds of life: 1 until the fade window opens,
/// then linear down to 0. A pure function of elapsed time.
pub fn opacity_at(elapsed: f64, lifetime: f64, fade_fraction: f64) -> f32 {
    if fade_fraction <= 0. {
        return 1.;
    }
    let fade_start = lifetime * (1. - fade_fraction);
    if elapsed <= fade_start {
        return 1.;
    }
    let fade_length = lifetime - fade_start;
    (1. - (elapsed - fade_start) / fade_length).max(0.) as f32
}

/// Marker bookkeeping: a de-dup set keyed by the source body (its own copy,
/// deliberately separate from the detector's) and the removal schedule.
#[derive(Default)]
pub struct ImpactMarkerData {
    /// Bodies with a live ring; re-admitted once the ring is removed.
    marked: FnvHashSet<Entity>,
    /// (ring, source body) keyed by negated expiry time: the queue pops its
    /// maximum, so negation surfaces the soonest removal first.
    removals: PriorityQueue<(Entity, Entity), OrderedFloat<f64>>,
}

impl ImpactMarkerData {
    /// First producer wins: at most one live ring per body, however many
    /// event streams feed this.
    fn admit(&mut self, source: Entity) -> bool {
        self.marked.insert(source)
    }
}

#[system]
pub fn spawn_impact_markers(
    commands: &mut CommandBuffer,
    #[resource] landing_data: &mut LandingDetectionData,
    #[resource] data: &mut ImpactMarkerData,
    #[resource] config: &MarkerConfig,
    #[resource] simulation_data: &SimulationData,
) {
    let now = simulation_data.time;
    for event in landing_data.events.drain(..) {
        if !data.admit(event.entity) {
            continue;
        }
        let marker = marker_from_event(&event, config, now);
        let ring = commands.push((marker,));
        data.removals
            .push((ring, event.entity), OrderedFloat(-(now + config.lifetime)));
        debug!(
            "Ring for {:?}: size {:.2}, expires {:.2}",
            event.entity,
            marker.size,
            now + config.lifetime
        );
    }
}

#[system]
#[write_component(ImpactMarker)]
pub fn update_impact_markers(
    world: &mut SubWorld,
    commands: &mut CommandBuffer,
    #[resource] data: &mut ImpactMarkerData,
    #[resource] config: &MarkerConfig,
    #[resource] simulation_data: &SimulationData,
) {
    let now = simulation_data.time;
    for marker in <&mut ImpactMarker>::query().iter_mut(world) {
        marker.opacity = opacity_at(now - marker.created_at, marker.lifetime, config.fade_fraction);
    }
    while let Some((&(ring, source), &expiry)) = data.removals.peek() {
        if -expiry.0 > now {
            break;
        }
        data.removals.pop();
        commands.remove(ring);
        data.marked.remove(&source);
    }
}
