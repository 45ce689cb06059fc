// Interface extraction module
// Scans the whole volume once and collects the physical centers of interface voxels

use segcloud_common::{
    CoordinateSystem, ExtractionStats, InterfaceMode, LabelSet, LabelVolume, PointCloud,
};

use crate::neighborhood::is_interface_voxel;

/// Collect interface voxel centers in LPS physical space.
/// Points come out in raster order (i fastest, then j, then k).
pub fn extract_interface_points(
    volume: &LabelVolume,
    targets: &LabelSet,
    mode: InterfaceMode,
) -> (PointCloud, ExtractionStats) {
    let [nx, ny, nz] = volume.dims();
    let mut cloud = PointCloud::new(CoordinateSystem::Lps);
    let mut stats = ExtractionStats::default();

    log::info!(
        "Scanning {}x{}x{} voxels for targets {} in {} mode",
        nx,
        ny,
        nz,
        targets,
        mode
    );

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                stats.voxels_visited += 1;

                let center = volume.data[[i, j, k]];
                if !targets.contains(center) {
                    continue;
                }
                stats.target_voxels += 1;

                if is_interface_voxel(volume, (i, j, k), targets, mode) {
                    stats.interface_voxels += 1;
                    cloud.push(volume.geometry.index_to_physical(i, j, k), center);
                }
            }
        }
    }

    log::info!(
        "Found {} interface voxel(s) among {} target voxel(s)",
        stats.interface_voxels,
        stats.target_voxels
    );
    if stats.target_voxels == 0 {
        log::warn!(
            "None of the target labels {} occur in the volume (labels present: {:?})",
            targets,
            volume.distinct_labels()
        );
    }

    (cloud, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segcloud_common::{ImageGeometry, Point3};

    /// 4x2x2 volume: x in 0..2 is label 1, x in 2..4 is label 2
    fn two_blocks(geometry: ImageGeometry) -> LabelVolume {
        let mut volume = LabelVolume::zeros([4, 2, 2], geometry);
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..4 {
                    volume.set(i, j, k, if i < 2 { 1 } else { 2 });
                }
            }
        }
        volume
    }

    #[test]
    fn interface_layer_between_two_blocks() {
        let volume = two_blocks(ImageGeometry::default());
        let (cloud, stats) = extract_interface_points(&volume, &LabelSet::new([1]), InterfaceMode::Segments);

        assert_eq!(stats.voxels_visited, 16);
        assert_eq!(stats.target_voxels, 8);
        assert_eq!(stats.interface_voxels, 4);
        assert_eq!(cloud.system, CoordinateSystem::Lps);
        assert_eq!(
            cloud.points,
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 1.0, 1.0),
            ]
        );
        assert_eq!(cloud.labels, vec![1; 4]);
    }

    #[test]
    fn points_use_image_geometry() {
        let geometry = ImageGeometry::new([100.0, 50.0, -20.0], [0.5, 1.0, 2.0]);
        let volume = two_blocks(geometry);
        let (cloud, _) = extract_interface_points(&volume, &LabelSet::new([2]), InterfaceMode::Segments);
        assert_eq!(cloud.points[0], Point3::new(101.0, 50.0, -20.0));
        assert_eq!(cloud.points[3], Point3::new(101.0, 51.0, -18.0));
    }

    #[test]
    fn both_labels_targeted_yields_no_segment_interface() {
        let volume = two_blocks(ImageGeometry::default());
        let (cloud, stats) =
            extract_interface_points(&volume, &LabelSet::new([1, 2]), InterfaceMode::Segments);
        assert!(cloud.is_empty());
        assert_eq!(stats.target_voxels, 16);
    }

    #[test]
    fn missing_target_label() {
        let volume = two_blocks(ImageGeometry::default());
        let (cloud, stats) = extract_interface_points(&volume, &LabelSet::new([9]), InterfaceMode::Background);
        assert!(cloud.is_empty());
        assert_eq!(stats.target_voxels, 0);
        assert_eq!(stats.voxels_visited, 16);
    }

    #[test]
    fn cube_surface_in_background_mode() {
        // 3x3x3 cube of label 1 centered in a 5x5x5 background
        let mut volume = LabelVolume::zeros([5, 5, 5], ImageGeometry::default());
        for k in 1..4 {
            for j in 1..4 {
                for i in 1..4 {
                    volume.set(i, j, k, 1);
                }
            }
        }
        let (cloud, _) = extract_interface_points(&volume, &LabelSet::new([1]), InterfaceMode::Background);
        assert_eq!(cloud.len(), 26);
        assert!(!cloud.points.contains(&Point3::new(2.0, 2.0, 2.0)));
    }
}
