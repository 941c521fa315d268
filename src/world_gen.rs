use legion::Resources;
use nalgebra::Vector3;
use rand_pcg::Pcg64;

use crate::court::{CourtScene, Surface, SurfaceKind};
use crate::flight::{FlightTimeConfig, FlightTimeData};
use crate::landing::{LandingConfig, LandingDetectionData};
use crate::launcher::{Launcher, LauncherConfig, LauncherState};
use crate::marker::{ImpactMarkerData, MarkerConfig};
use crate::preview::{PreviewConfig, PreviewPath};

/// Court dimensions, meters.
pub const COURT_HALF_LENGTH: f32 = 11.9;
pub const COURT_HALF_WIDTH: f32 = 4.1;
pub const NET_HEIGHT: f32 = 0.91;
pub const BACKBOARD_HEIGHT: f32 = 3.;

pub fn init_court() -> CourtScene {
    CourtScene {
        surfaces: vec![
            Surface::Plane {
                height: 0.,
                kind: SurfaceKind::Court,
            },
            // Net across the middle of the court.
            Surface::Panel {
                origin: Vector3::new(-COURT_HALF_WIDTH, 0., 0.),
                edge_u: Vector3::new(2. * COURT_HALF_WIDTH, 0., 0.),
                edge_v: Vector3::new(0., NET_HEIGHT, 0.),
                kind: SurfaceKind::Net,
            },
            // Backboard behind the far baseline.
            Surface::Panel {
                origin: Vector3::new(-COURT_HALF_WIDTH, 0., COURT_HALF_LENGTH),
                edge_u: Vector3::new(2. * COURT_HALF_WIDTH, 0., 0.),
                edge_v: Vector3::new(0., BACKBOARD_HEIGHT, 0.),
                kind: SurfaceKind::Backboard,
            },
        ],
    }
}

/// Insert every subsystem's configuration and bookkeeping with the
/// documented defaults. Each detector owns its own map; none of them share
/// state.
pub fn init_resources(resources: &mut Resources) {
    resources.insert(init_court());
    resources.insert(Launcher {
        origin: Vector3::new(0., 1., -COURT_HALF_LENGTH),
        azimuth: 0.,
        elevation: 0.35,
        speed: 12.,
    });
    resources.insert(LauncherConfig::default());
    resources.insert(LauncherState {
        rng: Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96),
        last_serve: -10.,
    });
    resources.insert(PreviewConfig::default());
    resources.insert(PreviewPath::default());
    resources.insert(LandingConfig::default());
    resources.insert(LandingDetectionData::default());
    resources.insert(MarkerConfig::default());
    resources.insert(ImpactMarkerData::default());
    resources.insert(FlightTimeConfig::default());
    resources.insert(FlightTimeData::default());
}
