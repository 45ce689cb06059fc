// Coordinate transform module
// Axis-scale transforms between patient coordinate conventions

use segcloud_common::{CoordinateSystem, Point3, PointCloud};

/// Per-axis scale applied about the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub scale: [f64; 3],
}

impl ScaleTransform {
    pub fn new(sx: f64, sy: f64, sz: f64) -> Self {
        Self { scale: [sx, sy, sz] }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// LPS and RAS differ by the sign of x and y; the flip is its own inverse
    pub fn between(from: CoordinateSystem, to: CoordinateSystem) -> Self {
        if from == to {
            Self::identity()
        } else {
            Self::new(-1.0, -1.0, 1.0)
        }
    }

    pub fn apply(&self, p: Point3) -> Point3 {
        Point3::new(p.x * self.scale[0], p.y * self.scale[1], p.z * self.scale[2])
    }
}

/// Re-express a point cloud in another coordinate system
pub fn convert_cloud(mut cloud: PointCloud, target: CoordinateSystem) -> PointCloud {
    let transform = ScaleTransform::between(cloud.system, target);
    log::debug!(
        "Converting {} point(s) from {} to {} with scale {:?}",
        cloud.len(),
        cloud.system,
        target,
        transform.scale
    );

    for point in cloud.points.iter_mut() {
        *point = transform.apply(*point);
    }
    cloud.system = target;
    cloud
}
