// Labeled volume model
// Voxel data plus the index-to-physical mapping (LPS, millimeters)

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::types::{Label, Point3};

/// Physical placement of a voxel grid
///
/// `direction` holds one column per image axis, so the physical position of
/// index `(i, j, k)` is `origin + direction * diag(spacing) * (i, j, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    /// Row-major, `direction[row][axis]`
    pub direction: [[f64; 3]; 3],
}

impl ImageGeometry {
    pub const IDENTITY_DIRECTION: [[f64; 3]; 3] =
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    pub fn new(origin: [f64; 3], spacing: [f64; 3]) -> Self {
        Self {
            origin,
            spacing,
            direction: Self::IDENTITY_DIRECTION,
        }
    }

    pub fn with_direction(mut self, direction: [[f64; 3]; 3]) -> Self {
        self.direction = direction;
        self
    }

    /// Physical coordinates of a voxel center
    pub fn index_to_physical(&self, i: usize, j: usize, k: usize) -> Point3 {
        let scaled = [
            i as f64 * self.spacing[0],
            j as f64 * self.spacing[1],
            k as f64 * self.spacing[2],
        ];
        let d = &self.direction;
        let component = |row: usize| {
            self.origin[row]
                + d[row][0] * scaled[0]
                + d[row][1] * scaled[1]
                + d[row][2] * scaled[2]
        };
        Point3::new(component(0), component(1), component(2))
    }
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self::new([0.0; 3], [1.0; 3])
    }
}

/// Segmentation volume indexed `[i, j, k]` along x, y, z
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    pub data: Array3<Label>,
    pub geometry: ImageGeometry,
}

impl LabelVolume {
    pub fn new(data: Array3<Label>, geometry: ImageGeometry) -> Self {
        Self { data, geometry }
    }

    /// Background-filled volume of the given size
    pub fn zeros(dims: [usize; 3], geometry: ImageGeometry) -> Self {
        Self::new(Array3::zeros((dims[0], dims[1], dims[2])), geometry)
    }

    /// Build from voxels stored x-fastest (file order of MetaImage and NIfTI)
    pub fn from_raster(dims: [usize; 3], voxels: Vec<Label>, geometry: ImageGeometry) -> Option<Self> {
        use ndarray::ShapeBuilder;
        let data = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), voxels).ok()?;
        Some(Self::new(data, geometry))
    }

    /// Voxels in x-fastest order
    pub fn to_raster(&self) -> Vec<Label> {
        let [nx, ny, nz] = self.dims();
        let mut out = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    out.push(self.data[[i, j, k]]);
                }
            }
        }
        out
    }

    pub fn dims(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    /// Label at a signed index, None outside the grid
    pub fn get(&self, i: isize, j: isize, k: isize) -> Option<Label> {
        if i < 0 || j < 0 || k < 0 {
            return None;
        }
        self.data.get([i as usize, j as usize, k as usize]).copied()
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, label: Label) {
        self.data[[i, j, k]] = label;
    }

    /// Sorted distinct labels present in the volume
    pub fn distinct_labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self.data.iter().copied().collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}
