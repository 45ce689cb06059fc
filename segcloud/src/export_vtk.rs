// Legacy VTK export module
// Exports point clouds as ASCII POLYDATA with one VERTICES cell per point

use anyhow::{Context, Result};
use segcloud_common::PointCloud;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export a point cloud to a legacy .vtk file
pub fn export_vtk(cloud: &PointCloud, output_path: &Path, with_labels: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    write_vtk(cloud, &mut out, with_labels)?;
    out.flush()?;

    log::info!(
        "Exported {} point(s) ({}) to legacy VTK: {}",
        cloud.len(),
        cloud.system,
        output_path.display()
    );
    Ok(())
}

pub fn write_vtk<W: Write>(cloud: &PointCloud, out: &mut W, with_labels: bool) -> Result<()> {
    let n = cloud.len();

    writeln!(out, "# vtk DataFile Version 3.0")?;
    writeln!(out, "segcloud interface points ({})", cloud.system)?;
    writeln!(out, "ASCII")?;
    writeln!(out, "DATASET POLYDATA")?;

    writeln!(out, "POINTS {} float", n)?;
    for pt in &cloud.points {
        writeln!(out, "{} {} {}", pt.x as f32, pt.y as f32, pt.z as f32)?;
    }

    // each cell is "1 <id>", hence 2n integers in total
    writeln!(out, "VERTICES {} {}", n, 2 * n)?;
    for id in 0..n {
        writeln!(out, "1 {}", id)?;
    }

    if with_labels && n > 0 {
        writeln!(out, "POINT_DATA {}", n)?;
        writeln!(out, "SCALARS Label short 1")?;
        writeln!(out, "LOOKUP_TABLE default")?;
        for label in &cloud.labels {
            writeln!(out, "{}", label)?;
        }
    }

    Ok(())
}
