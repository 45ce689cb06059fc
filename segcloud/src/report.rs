// Extraction report
// JSON summary of one run: parameters, counters and output bounds

use anyhow::{Context, Result};
use segcloud_common::{CoordinateSystem, ExtractionStats, InterfaceMode, Label, Point3};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub input: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub target_labels: Vec<Label>,
    pub mode: InterfaceMode,
    pub coordinate_system: CoordinateSystem,
    pub dimensions: [usize; 3],
    pub stats: ExtractionStats,
    pub points_written: usize,
    pub bounds: Option<(Point3, Point3)>,
}

impl ExtractionReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        log::info!("Saved extraction report to: {}", path.display());
        Ok(())
    }
}
