use nalgebra::Vector3;
use ordered_float::OrderedFloat;

pub const EPSILON: f32 = 1e-5;

/// Tag distinguishing the court plane from the obstacles above it; landing
/// confirmation only accepts `Court`.
#[derive(Clone, Copy, Debug, PartialEq, Hash, Eq)]
pub enum SurfaceKind {
    Court,
    Net,
    Backboard,
}

/// A piece of scene geometry the ball can run into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Surface {
    /// Infinite horizontal plane at a fixed height.
    Plane { height: f32, kind: SurfaceKind },
    /// Finite rectangle spanned by two edge vectors out of a corner.
    Panel {
        origin: Vector3<f32>,
        edge_u: Vector3<f32>,
        edge_v: Vector3<f32>,
        kind: SurfaceKind,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub point: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub kind: SurfaceKind,
    pub distance: f32,
}

/// "What, if anything, lies between two points" - the one capability the
/// preview and landing subsystems consume from the scene.
pub trait SurfaceQuery {
    /// Nearest intersection within `max_distance` of `from` along
    /// `direction` (unit length).
    fn intersect(
        &self,
        from: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<SurfaceHit>;
}

impl Surface {
    fn solve(
        &self,
        from: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        match self {
            Surface::Plane { height, kind } => {
                // from.y + t*d.y = height.
                if direction.y.abs() < EPSILON {
                    return None;
                }
                let t = (height - from.y) / direction.y;
                if t < 0. || t > max_distance {
                    return None;
                }
                Some(SurfaceHit {
                    point: from + direction * t,
                    normal: Vector3::new(0., -direction.y.signum(), 0.),
                    kind: *kind,
                    distance: t,
                })
            }
            Surface::Panel {
                origin,
                edge_u,
                edge_v,
                kind,
            } => {
                let normal = edge_u.cross(edge_v).normalize();
                let approach = normal.dot(&direction);
                if approach.abs() < EPSILON {
                    // Ray runs along the panel.
                    return None;
                }
                let t = normal.dot(&(origin - from)) / approach;
                if t < 0. || t > max_distance {
                    return None;
                }
                let point = from + direction * t;
                // Hit only counts inside the rectangle: 0<=(p-o).u/|u|^2<=1.
                let relative = point - origin;
                let u = relative.dot(edge_u) / edge_u.norm_squared();
                let v = relative.dot(edge_v) / edge_v.norm_squared();
                if u < 0. || u > 1. || v < 0. || v > 1. {
                    return None;
                }
                let facing = if approach > 0. { -normal } else { normal };
                Some(SurfaceHit {
                    point,
                    normal: facing,
                    kind: *kind,
                    distance: t,
                })
            }
        }
    }
}

/// The fixed scene: court plane plus net and backboard panels. Deterministic
/// between ticks; nothing here moves.
pub struct CourtScene {
    pub surfaces: Vec<Surface>,
}

impl SurfaceQuery for CourtScene {
    fn intersect(
        &self,
        from: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        self.surfaces
            .iter()
            .filter_map(|surface| surface.solve(from, direction, max_distance))
            .min_by_key(|hit| OrderedFloat(hit.distance))
    }
}
