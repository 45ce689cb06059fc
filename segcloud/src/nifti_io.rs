// NIfTI-1 reading
// Loads .nii / .nii.gz segmentations and converts their RAS world geometry to LPS

use anyhow::{bail, Context, Result};
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use segcloud_common::{ImageGeometry, Label, LabelVolume};
use std::path::Path;

/// Read a NIfTI segmentation, narrowing voxel values to labels
pub fn read_nifti(path: &Path) -> Result<LabelVolume> {
    let object = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let header = object.header().clone();

    let geometry = geometry_from_header(&header)?;
    log::debug!(
        "NIfTI {}: dim {:?}, sform_code {}, qform_code {}",
        path.display(),
        &header.dim[..=header.dim[0].min(7) as usize],
        header.sform_code,
        header.qform_code
    );

    let values = object
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to decode NIfTI voxel data")?;

    let shape = values.shape().to_vec();
    if shape.len() < 3 || shape[3..].iter().any(|&d| d != 1) {
        bail!("Expected a 3D segmentation, got volume of shape {:?}", shape);
    }
    let values = values
        .into_shape((shape[0], shape[1], shape[2]))
        .context("Failed to reshape NIfTI volume to 3D")?;

    let data: Array3<Label> = values.mapv(|v| v.round() as Label);
    Ok(LabelVolume::new(data, geometry))
}

/// Image-to-world geometry in LPS.
/// Prefers the sform, then the qform, then plain pixdim scaling.
pub fn geometry_from_header(header: &NiftiHeader) -> Result<ImageGeometry> {
    let affine = if header.sform_code > 0 {
        sform_affine(header)
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        log::warn!("NIfTI header has neither sform nor qform; using pixdim only");
        let mut affine = [[0.0; 4]; 3];
        for axis in 0..3 {
            affine[axis][axis] = header.pixdim[axis + 1].abs().max(f32::MIN_POSITIVE) as f64;
        }
        affine
    };

    let mut spacing = [0.0; 3];
    let mut direction = [[0.0; 3]; 3];
    for axis in 0..3 {
        let column = [affine[0][axis], affine[1][axis], affine[2][axis]];
        let norm = (column[0] * column[0] + column[1] * column[1] + column[2] * column[2]).sqrt();
        if norm == 0.0 {
            bail!("Degenerate NIfTI orientation: axis {} has zero length", axis);
        }
        spacing[axis] = norm;
        for row in 0..3 {
            direction[row][axis] = column[row] / norm;
        }
    }
    let mut origin = [affine[0][3], affine[1][3], affine[2][3]];

    // RAS -> LPS
    for row in 0..2 {
        origin[row] = -origin[row];
        for axis in 0..3 {
            direction[row][axis] = -direction[row][axis];
        }
    }

    Ok(ImageGeometry::new(origin, spacing).with_direction(direction))
}

fn sform_affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let row = |r: &[f32; 4]| [r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64];
    [row(&header.srow_x), row(&header.srow_y), row(&header.srow_z)]
}

fn qform_affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let rotation = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
    ];

    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let scale = [
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64 * qfac,
    ];
    let offset = [
        header.quatern_x as f64,
        header.quatern_y as f64,
        header.quatern_z as f64,
    ];

    let mut affine = [[0.0; 4]; 3];
    for r in 0..3 {
        for axis in 0..3 {
            affine[r][axis] = rotation[r][axis] * scale[axis];
        }
        affine[r][3] = offset[r];
    }
    affine
}
