use nalgebra::Vector3;

/// Standard tennis ball radius, meters.
pub const BALL_RADIUS: f32 = 0.033;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub radius: f32,
}

impl Ball {
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }
}
