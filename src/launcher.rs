use legion::system;
use legion::systems::CommandBuffer;
use log::info;
use nalgebra::Vector3;
use rand::Rng;
use rand_pcg::Pcg64;

use crate::ball::{Ball, BALL_RADIUS};
use crate::simulation::SimulationData;

/// The training launcher: a fixed muzzle with a sweeping aim. The preview
/// always reflects this state, whether or not a serve is due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Launcher {
    pub origin: Vector3<f32>,
    /// Radians around +y; zero aims down +z.
    pub azimuth: f32,
    /// Radians above the horizontal.
    pub elevation: f32,
    /// Muzzle speed, m/s.
    pub speed: f32,
}

impl Launcher {
    /// Initial velocity a ball fired right now would get.
    pub fn aim_velocity(&self) -> Vector3<f32> {
        let horizontal = self.speed * self.elevation.cos();
        Vector3::new(
            horizontal * self.azimuth.sin(),
            self.speed * self.elevation.sin(),
            horizontal * self.azimuth.cos(),
        )
    }
}

/// Serve pacing and jitter ranges for a training session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LauncherConfig {
    pub serve_interval: f64,
    pub speed_range: (f32, f32),
    pub elevation_range: (f32, f32),
    /// Amplitude of the slow side-to-side aim sweep, radians.
    pub azimuth_sweep: f32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            serve_interval: 1.5,
            speed_range: (8., 16.),
            elevation_range: (0.2, 0.6),
            azimuth_sweep: 0.35,
        }
    }
}

pub struct LauncherState {
    pub rng: Pcg64,
    pub last_serve: f64,
}

#[system]
pub fn serve(
    commands: &mut CommandBuffer,
    #[resource] launcher: &mut Launcher,
    #[resource] launcher_config: &LauncherConfig,
    #[resource] state: &mut LauncherState,
    #[resource] simulation_data: &SimulationData,
) {
    let now = simulation_data.time;
    // Sweep the aim so the preview keeps moving between serves.
    launcher.azimuth = launcher_config.azimuth_sweep * (now as f32 * 0.4).sin();
    if now - state.last_serve < launcher_config.serve_interval {
        return;
    }
    state.last_serve = now;
    launcher.speed = state
        .rng
        .gen_range(launcher_config.speed_range.0..launcher_config.speed_range.1);
    launcher.elevation = state
        .rng
        .gen_range(launcher_config.elevation_range.0..launcher_config.elevation_range.1);
    commands.push((Ball {
        position: launcher.origin,
        velocity: launcher.aim_velocity(),
        radius: BALL_RADIUS,
    },));
    info!(
        "Serve at {:.2}s: speed {:.1} m/s, elevation {:.2} rad, azimuth {:.2} rad",
        now, launcher.speed, launcher.elevation, launcher.azimuth
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_aim_is_all_horizontal() {
        let launcher = Launcher {
            origin: Vector3::zeros(),
            azimuth: 0.,
            elevation: 0.,
            speed: 10.,
        };
        assert_relative_eq!(
            launcher.aim_velocity(),
            Vector3::new(0., 0., 10.),
            epsilon = 1e-5
        );
    }

    #[test]
    fn vertical_aim_is_all_lift() {
        let launcher = Launcher {
            origin: Vector3::zeros(),
            azimuth: 0.7,
            elevation: std::f32::consts::FRAC_PI_2,
            speed: 10.,
        };
        let velocity = launcher.aim_velocity();
        assert_relative_eq!(velocity.y, 10., epsilon = 1e-4);
        assert!(velocity.x.abs() < 1e-4 && velocity.z.abs() < 1e-4);
    }

    #[test]
    fn aim_speed_is_preserved() {
        let launcher = Launcher {
            origin: Vector3::zeros(),
            azimuth: -0.3,
            elevation: 0.45,
            speed: 12.5,
        };
        assert_relative_eq!(launcher.aim_velocity().norm(), 12.5, epsilon = 1e-4);
    }
}
