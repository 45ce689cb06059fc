// VTP export module
// Exports point clouds to VTK XML PolyData (ASCII), one vertex cell per point

use anyhow::{Context, Result};
use segcloud_common::PointCloud;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export a point cloud to a .vtp file
/// Coordinates are in millimeters, in the cloud's coordinate system
pub fn export_vtp(cloud: &PointCloud, output_path: &Path, with_labels: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    write_vtp(cloud, &mut out, with_labels)?;
    out.flush()?;

    log::info!(
        "Exported {} point(s) ({}) to VTP: {}",
        cloud.len(),
        cloud.system,
        output_path.display()
    );
    Ok(())
}

/// Write the XML document to any sink
pub fn write_vtp<W: Write>(cloud: &PointCloud, out: &mut W, with_labels: bool) -> Result<()> {
    let n = cloud.len();

    writeln!(out, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        out,
        r#"<VTKFile type="PolyData" version="1.0" byte_order="LittleEndian" header_type="UInt64">"#
    )?;
    writeln!(out, "  <PolyData>")?;
    writeln!(
        out,
        r#"    <Piece NumberOfPoints="{}" NumberOfVerts="{}" NumberOfLines="0" NumberOfStrips="0" NumberOfPolys="0">"#,
        n, n
    )?;

    if with_labels {
        writeln!(out, r#"      <PointData Scalars="Label">"#)?;
        writeln!(out, r#"        <DataArray type="Int16" Name="Label" format="ascii">"#)?;
        for label in &cloud.labels {
            writeln!(out, "          {}", label)?;
        }
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </PointData>")?;
    } else {
        writeln!(out, "      <PointData>")?;
        writeln!(out, "      </PointData>")?;
    }
    writeln!(out, "      <CellData>")?;
    writeln!(out, "      </CellData>")?;

    writeln!(out, "      <Points>")?;
    writeln!(
        out,
        r#"        <DataArray type="Float32" Name="Points" NumberOfComponents="3" format="ascii">"#
    )?;
    for pt in &cloud.points {
        writeln!(out, "          {} {} {}", pt.x as f32, pt.y as f32, pt.z as f32)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Points>")?;

    // every point is its own vertex cell
    writeln!(out, "      <Verts>")?;
    writeln!(out, r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#)?;
    for id in 0..n {
        writeln!(out, "          {}", id)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#)?;
    for id in 1..=n {
        writeln!(out, "          {}", id)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Verts>")?;

    for section in ["Lines", "Strips", "Polys"] {
        writeln!(out, "      <{}>", section)?;
        writeln!(out, r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#)?;
        writeln!(out, "        </DataArray>")?;
        writeln!(out, r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#)?;
        writeln!(out, "        </DataArray>")?;
        writeln!(out, "      </{}>", section)?;
    }

    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </PolyData>")?;
    writeln!(out, "</VTKFile>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use segcloud_common::{CoordinateSystem, Point3};

    fn render(cloud: &PointCloud, with_labels: bool) -> String {
        let mut buf = Vec::new();
        write_vtp(cloud, &mut buf, with_labels).unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// Whitespace-separated values inside the DataArray named `name`
    fn array_values(doc: &str, name: &str) -> Vec<String> {
        let marker = format!(r#"Name="{}""#, name);
        let start = doc.find(&marker).unwrap();
        let body_start = start + doc[start..].find('>').unwrap() + 1;
        let body_end = body_start + doc[body_start..].find("</DataArray>").unwrap();
        doc[body_start..body_end]
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn points_and_vertex_cells() {
        let mut cloud = PointCloud::new(CoordinateSystem::Ras);
        cloud.push(Point3::new(-1.5, 2.0, 3.25), 4);
        cloud.push(Point3::new(0.0, -7.0, 1.0), 5);

        let doc = render(&cloud, false);
        assert!(doc.contains(r#"NumberOfPoints="2" NumberOfVerts="2""#));
        assert_eq!(array_values(&doc, "Points"), vec!["-1.5", "2", "3.25", "0", "-7", "1"]);
        assert_eq!(array_values(&doc, "connectivity"), vec!["0", "1"]);
        assert_eq!(array_values(&doc, "offsets"), vec!["1", "2"]);
        assert!(!doc.contains(r#"Name="Label""#));
        assert!(doc.trim_end().ends_with("</VTKFile>"));
    }

    #[test]
    fn label_array_is_optional() {
        let mut cloud = PointCloud::new(CoordinateSystem::Ras);
        cloud.push(Point3::new(1.0, 1.0, 1.0), 4);
        cloud.push(Point3::new(2.0, 2.0, 2.0), 7);

        let doc = render(&cloud, true);
        assert_eq!(array_values(&doc, "Label"), vec!["4", "7"]);
    }

    #[test]
    fn empty_cloud_is_still_a_valid_document() {
        let doc = render(&PointCloud::new(CoordinateSystem::Ras), false);
        assert!(doc.contains(r#"NumberOfPoints="0" NumberOfVerts="0""#));
        assert!(array_values(&doc, "Points").is_empty());
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.vtp");
        let mut cloud = PointCloud::new(CoordinateSystem::Ras);
        cloud.push(Point3::new(1.0, 2.0, 3.0), 1);
        export_vtp(&cloud, &path, false).unwrap();
        let doc = std::fs::read_to_string(&path).unwrap();
        assert_eq!(array_values(&doc, "Points"), vec!["1", "2", "3"]);
    }
}
