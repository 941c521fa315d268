pub mod dash;
pub mod predict;

pub use dash::dash_path;
pub use predict::predict_path;

pub const EPSILON: f32 = 1e-5;

use legion::system;
use nalgebra::Vector3;

use crate::court::CourtScene;
use crate::launcher::Launcher;
use crate::simulation::SimulationConfig;

/// Aim-preview knobs. Lengths in meters; the sample step is deliberately
/// coarser than the live tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewConfig {
    pub sample_time_delta: f32,
    pub max_samples: usize,
    /// Prediction cutoff height.
    pub floor_y: f32,
    pub dash_length: f32,
    pub gap_length: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            sample_time_delta: 0.05,
            max_samples: 200,
            floor_y: 0.,
            dash_length: 0.35,
            gap_length: 0.2,
        }
    }
}

/// The forward-looking "if fired now" path. Rebuilt from scratch every tick
/// against the launcher's current aim; never fed back into physics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreviewPath {
    pub samples: Vec<Vector3<f32>>,
    pub dashed: Vec<Vector3<f32>>,
}

#[system]
pub fn refresh_preview(
    #[resource] launcher: &Launcher,
    #[resource] scene: &CourtScene,
    #[resource] preview_config: &PreviewConfig,
    #[resource] simulation_config: &SimulationConfig,
    #[resource] preview: &mut PreviewPath,
) {
    preview.samples = predict_path(
        launcher.origin,
        launcher.aim_velocity(),
        simulation_config.gravity,
        preview_config.sample_time_delta,
        preview_config.max_samples,
        preview_config.floor_y,
        scene,
    );
    preview.dashed = dash_path(&preview.samples, preview_config.dash_length, preview_config.gap_length);
}
