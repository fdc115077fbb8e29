/// Road surface height as seen by the tire contact points.
///
/// Implementors return the height (m) of the road at world position `(x, y)`.
/// The body stage samples it once per wheel each tick. Any `Fn(f64, f64) -> f64`
/// closure is a road profile.
pub trait RoadProfile {
    fn height(&self, x: f64, y: f64) -> f64;
}

/// Level road at zero height everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRoad;

impl RoadProfile for FlatRoad {
    fn height(&self, _x: f64, _y: f64) -> f64 {
        0.0
    }
}

impl<F> RoadProfile for F
where
    F: Fn(f64, f64) -> f64,
{
    fn height(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}
