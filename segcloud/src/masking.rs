// Point masking module
// Thins a point cloud by keeping every Nth point, optionally capped at a maximum count

use anyhow::{bail, Result};
use segcloud_common::PointCloud;

/// Subsampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskOptions {
    /// Keep one point out of every `on_ratio`
    pub on_ratio: usize,
    /// Stop once this many points are kept
    pub max_points: Option<usize>,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            on_ratio: 1,
            max_points: None,
        }
    }
}

/// Keep points 0, r, 2r, ... up to `max_points`.
/// Each surviving point later becomes its own vertex cell on export.
pub fn mask_points(cloud: PointCloud, options: MaskOptions) -> Result<PointCloud> {
    if options.on_ratio == 0 {
        bail!("On-ratio must be at least 1");
    }

    let limit = options.max_points.unwrap_or(usize::MAX);
    if options.on_ratio == 1 && limit >= cloud.len() {
        return Ok(cloud);
    }

    let original = cloud.len();
    let mut masked = PointCloud::new(cloud.system);
    for (point, label) in cloud
        .points
        .into_iter()
        .zip(cloud.labels)
        .step_by(options.on_ratio)
        .take(limit)
    {
        masked.push(point, label);
    }

    log::info!(
        "Masked {} point(s) down to {} (on-ratio {}, max {:?})",
        original,
        masked.len(),
        options.on_ratio,
        options.max_points
    );
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segcloud_common::{CoordinateSystem, Point3};

    fn cloud(n: usize) -> PointCloud {
        let mut cloud = PointCloud::new(CoordinateSystem::Lps);
        for i in 0..n {
            cloud.push(Point3::new(i as f64, 0.0, 0.0), i as i16);
        }
        cloud
    }

    #[test]
    fn default_keeps_everything() {
        let masked = mask_points(cloud(5), MaskOptions::default()).unwrap();
        assert_eq!(masked, cloud(5));
    }

    #[test]
    fn keeps_every_nth_point() {
        let options = MaskOptions { on_ratio: 3, max_points: None };
        let masked = mask_points(cloud(10), options).unwrap();
        assert_eq!(masked.labels, vec![0, 3, 6, 9]);
        assert_eq!(masked.points[1], Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn respects_max_points() {
        let options = MaskOptions { on_ratio: 2, max_points: Some(2) };
        let masked = mask_points(cloud(10), options).unwrap();
        assert_eq!(masked.labels, vec![0, 2]);
    }

    #[test]
    fn zero_ratio_is_an_error() {
        let options = MaskOptions { on_ratio: 0, max_points: None };
        assert!(mask_points(cloud(3), options).is_err());
    }
}
