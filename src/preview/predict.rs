use nalgebra::Vector3;

use crate::court::SurfaceQuery;

/// Integrate the ballistic path a ball fired right now would take.
///
/// Semi-implicit Euler, matching the live integrator: velocity is advanced
/// first, then position with the new velocity. Every step after the first is
/// checked against the scene along the segment it would travel; on a hit the
/// hit point replaces the candidate sample and integration stops, so the
/// drawn path ends on the surface instead of overshooting through it.
/// Integration also stops once a sample drops below `floor_y` (that sample
/// is kept) or at `max_samples`. Deterministic for fixed inputs.
pub fn predict_path<Q: SurfaceQuery>(
    origin: Vector3<f32>,
    initial_velocity: Vector3<f32>,
    gravity: Vector3<f32>,
    time_delta: f32,
    max_samples: usize,
    floor_y: f32,
    query: &Q,
) -> Vec<Vector3<f32>> {
    let mut points = Vec::with_capacity(max_samples);
    points.push(origin);
    let mut position = origin;
    let mut velocity = initial_velocity;
    while points.len() < max_samples {
        velocity += gravity * time_delta;
        let candidate = position + velocity * time_delta;
        let step = candidate - position;
        let length = step.norm();
        if length > super::EPSILON {
            if let Some(hit) = query.intersect(position, step / length, length) {
                points.push(hit.point);
                break;
            }
        }
        points.push(candidate);
        position = candidate;
        if position.y < floor_y {
            break;
        }
    }
    points
}
