use legion::system;
use legion::systems::CommandBuffer;
use legion::world::SubWorld;
use legion::{Entity, IntoQuery};
use nalgebra::Vector3;

use crate::{ball::Ball, simulation::SimulationConfig};

/// Fraction of vertical speed the court gives back per bounce.
const RESTITUTION: f32 = 0.55;
/// Fraction of horizontal speed kept per bounce.
const FRICTION: f32 = 0.8;
/// Vertical speed under which a bounce becomes rest.
const DEAD_BOUNCE: f32 = 0.2;
/// Below this the ball has left the playable world entirely.
const OUT_OF_WORLD: f32 = -20.;
/// Balls slower than this on the court are done.
const REST_SPEED: f32 = 0.05;

#[system(for_each)]
pub fn advance_balls(ball: &mut Ball, #[resource] simulation_config: &SimulationConfig) {
    advance_single_ball(
        ball,
        simulation_config.gravity,
        simulation_config.time_delta as f32,
    );
}

/// One semi-implicit Euler step plus the court-plane bounce. This is the
/// stand-in for the external rigid-body engine; everything downstream only
/// observes its output.
pub fn advance_single_ball(ball: &mut Ball, gravity: Vector3<f32>, time_delta: f32) {
    ball.velocity += gravity * time_delta;
    ball.position += ball.velocity * time_delta;
    if ball.position.y < ball.radius && ball.velocity.y < 0. {
        // v -= 2*(v.n)*n against the court normal, damped.
        ball.position.y = ball.radius;
        ball.velocity.y = -ball.velocity.y * RESTITUTION;
        ball.velocity.x *= FRICTION;
        ball.velocity.z *= FRICTION;
        if ball.velocity.y < DEAD_BOUNCE {
            ball.velocity.y = 0.;
        }
    }
}

#[system]
#[read_component(Ball)]
pub fn retire_balls(world: &mut SubWorld, commands: &mut CommandBuffer) {
    for (entity, ball) in <(Entity, &Ball)>::query().iter(world) {
        let resting = ball.speed() < REST_SPEED && ball.position.y < ball.radius + 1e-3;
        if resting || ball.position.y < OUT_OF_WORLD {
            commands.remove(*entity);
        }
    }
}
