// Segmentation volume reading
// Picks a decoder from the file name

use anyhow::{bail, Context, Result};
use segcloud_common::metaimage::read_metaimage;
use segcloud_common::LabelVolume;
use std::path::Path;

use crate::nifti_io::read_nifti;

/// Supported on-disk volume formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Nifti,
    MetaImage,
}

impl VolumeFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(VolumeFormat::Nifti)
        } else if name.ends_with(".mha") || name.ends_with(".mhd") {
            Some(VolumeFormat::MetaImage)
        } else {
            None
        }
    }
}

/// Load a labeled volume from disk
pub fn read_segmentation(path: &Path) -> Result<LabelVolume> {
    let Some(format) = VolumeFormat::detect(path) else {
        bail!(
            "Unsupported segmentation file {} (expected .nii, .nii.gz, .mha or .mhd)",
            path.display()
        );
    };

    let volume = match format {
        VolumeFormat::Nifti => read_nifti(path)?,
        VolumeFormat::MetaImage => read_metaimage(path)
            .with_context(|| format!("Failed to read MetaImage {}", path.display()))?,
    };

    let [nx, ny, nz] = volume.dims();
    log::info!(
        "Loaded {:?} volume {}: {}x{}x{} voxels, spacing {:?}, origin {:?}",
        format,
        path.display(),
        nx,
        ny,
        nz,
        volume.geometry.spacing,
        volume.geometry.origin
    );
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nifti_io::tests::nifti_bytes;
    use segcloud_common::metaimage::write_mha;
    use segcloud_common::ImageGeometry;
    use std::path::PathBuf;

    #[test]
    fn detects_formats_from_name() {
        assert_eq!(VolumeFormat::detect(Path::new("a/seg.nii")), Some(VolumeFormat::Nifti));
        assert_eq!(VolumeFormat::detect(Path::new("seg.NII.GZ")), Some(VolumeFormat::Nifti));
        assert_eq!(VolumeFormat::detect(Path::new("seg.mha")), Some(VolumeFormat::MetaImage));
        assert_eq!(VolumeFormat::detect(Path::new("seg.mhd")), Some(VolumeFormat::MetaImage));
        assert_eq!(VolumeFormat::detect(Path::new("seg.nrrd")), None);
        assert_eq!(VolumeFormat::detect(&PathBuf::new()), None);
    }

    #[test]
    fn reads_both_formats() {
        let dir = tempfile::tempdir().unwrap();

        let mut volume = LabelVolume::zeros([2, 2, 2], ImageGeometry::default());
        volume.set(1, 1, 1, 6);
        let mha = dir.path().join("seg.mha");
        write_mha(&volume, &mha, true).unwrap();
        assert_eq!(read_segmentation(&mha).unwrap(), volume);

        let nii = dir.path().join("seg.nii");
        std::fs::write(&nii, nifti_bytes([2, 2, 2], &[0, 0, 0, 0, 0, 0, 0, 6], [1.0; 3], None)).unwrap();
        assert_eq!(read_segmentation(&nii).unwrap().get(1, 1, 1), Some(6));
    }

    #[test]
    fn unsupported_and_missing_files_fail() {
        assert!(read_segmentation(Path::new("volume.png")).is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(read_segmentation(&dir.path().join("absent.mha")).is_err());
    }
}
