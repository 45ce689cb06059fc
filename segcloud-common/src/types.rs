use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Segmentation pixel type (signed 16-bit, 0 is background)
pub type Label = i16;

/// Label value reserved for the background
pub const BACKGROUND: Label = 0;

/// Set of target labels whose interfaces are extracted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    labels: BTreeSet<Label>,
}

impl LabelSet {
    pub fn new<I: IntoIterator<Item = Label>>(labels: I) -> Self {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn contains(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.labels.iter().map(|l| l.to_string()).collect();
        write!(f, "{{{}}}", labels.join(", "))
    }
}

/// Which neighbors make a target voxel part of the extracted interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterfaceMode {
    /// Touches a positive label outside the target set
    #[default]
    Segments,
    /// Touches the background (outer contour of the target set)
    Background,
    /// Touches another segment and the background at once
    Contour,
}

impl InterfaceMode {
    /// Whether a voxel with the given neighborhood findings qualifies
    pub fn accepts(&self, touches_other_segment: bool, touches_background: bool) -> bool {
        match self {
            InterfaceMode::Segments => touches_other_segment,
            InterfaceMode::Background => touches_background,
            InterfaceMode::Contour => touches_other_segment && touches_background,
        }
    }
}

impl fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceMode::Segments => write!(f, "segments (interface with other labels)"),
            InterfaceMode::Background => write!(f, "background (outer contour)"),
            InterfaceMode::Contour => write!(f, "contour (segment interface on the outer surface)"),
        }
    }
}

/// Patient coordinate convention of a point set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Image convention: +x left, +y posterior, +z superior
    Lps,
    /// Display convention: +x right, +y anterior, +z superior
    Ras,
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::Lps => write!(f, "LPS"),
            CoordinateSystem::Ras => write!(f, "RAS"),
        }
    }
}

/// 3D point in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Sparse point set with the label of the voxel each point came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3>,
    /// Parallel to `points`
    pub labels: Vec<Label>,
    pub system: CoordinateSystem,
}

impl PointCloud {
    pub fn new(system: CoordinateSystem) -> Self {
        Self {
            points: Vec::new(),
            labels: Vec::new(),
            system,
        }
    }

    pub fn push(&mut self, point: Point3, label: Label) {
        self.points.push(point);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns (min, max) corners, or None for an empty cloud
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        let first = *self.points.first()?;
        let (mut min, mut max) = (first, first);
        for pt in &self.points[1..] {
            min.x = min.x.min(pt.x);
            min.y = min.y.min(pt.y);
            min.z = min.z.min(pt.z);
            max.x = max.x.max(pt.x);
            max.y = max.y.max(pt.y);
            max.z = max.z.max(pt.z);
        }
        Some((min, max))
    }
}

/// Counters gathered while scanning a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub voxels_visited: usize,
    pub target_voxels: usize,
    pub interface_voxels: usize,
}

/// Output format for point clouds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// VTK XML PolyData
    Vtp,
    /// Legacy VTK polydata
    Vtk,
    Both,
}

impl OutputFormat {
    /// Guess the format from an output file extension, defaulting to VTP
    pub fn from_extension(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("vtk") => OutputFormat::Vtk,
            _ => OutputFormat::Vtp,
        }
    }
}
