// Boundary classification module
// Inspects the 3x3x3 neighborhood of a voxel to decide whether it lies on a segment interface

use segcloud_common::{InterfaceMode, Label, LabelSet, LabelVolume, BACKGROUND};

/// Number of voxels in a radius-1 neighborhood, center included
pub const NEIGHBORHOOD_SIZE: usize = 27;

/// Offsets of a radius-1 neighborhood, x varying fastest
pub fn neighborhood_offsets() -> [(isize, isize, isize); NEIGHBORHOOD_SIZE] {
    let mut offsets = [(0, 0, 0); NEIGHBORHOOD_SIZE];
    let mut n = 0;
    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                offsets[n] = (dx, dy, dz);
                n += 1;
            }
        }
    }
    offsets
}

/// What a voxel's in-bounds neighbors touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborhoodFindings {
    /// A positive label outside the target set
    pub other_segment: bool,
    /// The background label
    pub background: bool,
}

/// Scan the neighbors of `(i, j, k)`.
/// Neighbors outside the grid are skipped, so the image border never counts as background.
pub fn inspect_neighborhood(
    volume: &LabelVolume,
    (i, j, k): (usize, usize, usize),
    center: Label,
    targets: &LabelSet,
) -> NeighborhoodFindings {
    let mut findings = NeighborhoodFindings::default();

    for (dx, dy, dz) in neighborhood_offsets() {
        let Some(value) = volume.get(i as isize + dx, j as isize + dy, k as isize + dz) else {
            continue;
        };

        if value > BACKGROUND && value != center && !targets.contains(value) {
            findings.other_segment = true;
        }
        if value == BACKGROUND {
            findings.background = true;
        }

        if findings.other_segment && findings.background {
            break;
        }
    }

    findings
}

/// Whether the voxel at `(i, j, k)` belongs to the requested interface
pub fn is_interface_voxel(
    volume: &LabelVolume,
    index: (usize, usize, usize),
    targets: &LabelSet,
    mode: InterfaceMode,
) -> bool {
    let (i, j, k) = index;
    let center = volume.data[[i, j, k]];
    if !targets.contains(center) {
        return false;
    }

    let findings = inspect_neighborhood(volume, index, center, targets);
    mode.accepts(findings.other_segment, findings.background)
}
