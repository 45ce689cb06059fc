// Sphere phantom generator
// Builds a labeled sphere split into azimuthal wedges, one label per wedge

use anyhow::{bail, Result};
use segcloud_common::{ImageGeometry, Label, LabelVolume, BACKGROUND};
use std::f64::consts::PI;

/// Phantom layout in voxels and millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomConfig {
    /// Grid size (voxels per axis)
    pub dims: [usize; 3],
    /// Voxel size in millimeters
    pub spacing: [f64; 3],
    /// Physical position of voxel (0, 0, 0)
    pub origin: [f64; 3],
    /// Sphere radius in millimeters
    pub radius_mm: f64,
    /// Number of wedge segments, labeled 1..=segments
    pub segments: usize,
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            dims: [64, 64, 64],
            spacing: [1.0; 3],
            origin: [0.0; 3],
            radius_mm: 24.0,
            segments: 4,
        }
    }
}

/// Generate the phantom volume
pub fn generate_sphere_phantom(config: &PhantomConfig) -> Result<LabelVolume> {
    if config.segments == 0 || config.segments > Label::MAX as usize {
        bail!("Segment count must be between 1 and {}", Label::MAX);
    }
    if config.dims.iter().any(|&d| d == 0) {
        bail!("Phantom dimensions must be non-zero, got {:?}", config.dims);
    }
    if config.spacing.iter().any(|&s| s <= 0.0) {
        bail!("Voxel spacing must be positive, got {:?}", config.spacing);
    }

    let geometry = ImageGeometry::new(config.origin, config.spacing);
    let mut volume = LabelVolume::zeros(config.dims, geometry);

    // center of the grid in index-scaled millimeters
    let center: Vec<f64> = (0..3)
        .map(|a| (config.dims[a] as f64 - 1.0) * 0.5 * config.spacing[a])
        .collect();
    let radius_sq = config.radius_mm * config.radius_mm;
    let wedge = 2.0 * PI / config.segments as f64;

    let [nx, ny, nz] = config.dims;
    let mut filled = 0usize;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let dx = i as f64 * config.spacing[0] - center[0];
                let dy = j as f64 * config.spacing[1] - center[1];
                let dz = k as f64 * config.spacing[2] - center[2];
                if dx * dx + dy * dy + dz * dz > radius_sq {
                    continue;
                }
                volume.set(i, j, k, wedge_label(dx, dy, wedge, config.segments));
                filled += 1;
            }
        }
    }

    log::info!(
        "Generated {}x{}x{} phantom: radius {}mm, {} segment(s), {} labeled voxel(s)",
        nx,
        ny,
        nz,
        config.radius_mm,
        config.segments,
        filled
    );
    Ok(volume)
}

/// Label of the wedge containing azimuth atan2(dy, dx)
fn wedge_label(dx: f64, dy: f64, wedge: f64, segments: usize) -> Label {
    let angle = dy.atan2(dx).rem_euclid(2.0 * PI);
    let index = ((angle / wedge) as usize).min(segments - 1);
    index as Label + 1
}

/// Count voxels carrying `label`
pub fn count_label(volume: &LabelVolume, label: Label) -> usize {
    volume.data.iter().filter(|&&v| v == label).count()
}

/// Fraction of the grid left as background
pub fn background_fraction(volume: &LabelVolume) -> f64 {
    count_label(volume, BACKGROUND) as f64 / volume.voxel_count() as f64
}
