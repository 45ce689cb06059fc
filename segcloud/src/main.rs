use anyhow::{bail, Result};
use clap::Parser;
use segcloud_common::{CoordinateSystem, InterfaceMode, Label, LabelSet, OutputFormat};
use std::path::{Path, PathBuf};

mod export_vtk;
mod export_vtp;
mod extraction;
mod masking;
mod neighborhood;
mod nifti_io;
mod reader;
mod report;
mod transform;

use masking::MaskOptions;
use report::ExtractionReport;

/// Extract the interfaces of labeled segments into clouds of points
#[derive(Parser, Debug)]
#[command(name = "segcloud")]
#[command(about = "Extract segment interfaces of a labeled volume into point clouds", long_about = None)]
struct Args {
    /// Input segmentation (.nii, .nii.gz, .mha, .mhd)
    #[arg(short, long)]
    input: PathBuf,

    /// Label to extract (repeat or comma-separate for several)
    #[arg(short, long = "label", required = true, value_delimiter = ',', allow_negative_numbers = true)]
    labels: Vec<Label>,

    /// Output point cloud path
    #[arg(short, long, default_value = "interface.vtp")]
    output: PathBuf,

    /// Compute only the contour: segment interfaces that also touch the background
    #[arg(short, long, conflicts_with = "mode")]
    contour: bool,

    /// Which neighbors make a voxel part of the interface
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Output format (default: from the output extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Keep one point out of every N
    #[arg(long, default_value = "1")]
    on_ratio: usize,

    /// Maximum number of points to write
    #[arg(long)]
    max_points: Option<usize>,

    /// Coordinate convention of the written points
    #[arg(long, value_enum, default_value = "ras")]
    coordinates: CoordinatesArg,

    /// Attach the source label of every point as point data
    #[arg(long)]
    label_array: bool,

    /// Write a JSON summary of the run
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Segments,
    Background,
    Contour,
}

impl From<ModeArg> for InterfaceMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Segments => InterfaceMode::Segments,
            ModeArg::Background => InterfaceMode::Background,
            ModeArg::Contour => InterfaceMode::Contour,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Vtp,
    Vtk,
    Both,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Vtp => OutputFormat::Vtp,
            FormatArg::Vtk => OutputFormat::Vtk,
            FormatArg::Both => OutputFormat::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CoordinatesArg {
    Ras,
    Lps,
}

impl From<CoordinatesArg> for CoordinateSystem {
    fn from(arg: CoordinatesArg) -> Self {
        match arg {
            CoordinatesArg::Ras => CoordinateSystem::Ras,
            CoordinatesArg::Lps => CoordinateSystem::Lps,
        }
    }
}

impl Args {
    fn interface_mode(&self) -> InterfaceMode {
        match (self.contour, self.mode) {
            (true, _) => InterfaceMode::Contour,
            (false, Some(mode)) => mode.into(),
            (false, None) => InterfaceMode::Segments,
        }
    }

    fn output_format(&self) -> OutputFormat {
        self.format
            .map(OutputFormat::from)
            .unwrap_or_else(|| OutputFormat::from_extension(&self.output))
    }
}

/// Paths the point cloud is written to for a given format.
/// The extension always matches the format written.
fn output_paths(output: &Path, format: OutputFormat) -> Vec<(OutputFormat, PathBuf)> {
    let with_format = |single: OutputFormat, ext: &str| {
        let path = output.with_extension(ext);
        if format != OutputFormat::Both && path != output {
            log::warn!(
                "Output {} does not match the {:?} format; writing {}",
                output.display(),
                single,
                path.display()
            );
        }
        (single, path)
    };
    match format {
        OutputFormat::Both => vec![
            with_format(OutputFormat::Vtp, "vtp"),
            with_format(OutputFormat::Vtk, "vtk"),
        ],
        OutputFormat::Vtp => vec![with_format(OutputFormat::Vtp, "vtp")],
        OutputFormat::Vtk => vec![with_format(OutputFormat::Vtk, "vtk")],
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(args: &Args) -> Result<ExtractionReport> {
    let targets: LabelSet = args.labels.iter().copied().collect();
    if targets.is_empty() {
        bail!("At least one target label is required");
    }
    log::debug!("Targeting {} distinct label(s): {}", targets.len(), targets);
    let mode = args.interface_mode();
    let system: CoordinateSystem = args.coordinates.into();

    // Step 1: Read the segmentation
    println!("Step 1: Reading segmentation...");
    let volume = reader::read_segmentation(&args.input)?;

    // Step 2: Classify voxels by their neighborhood
    println!("\nStep 2: Extracting {} interface voxels...", mode);
    let (cloud, stats) = extraction::extract_interface_points(&volume, &targets, mode);
    println!(
        "Found {} interface point(s) ({} target voxel(s) of {})",
        stats.interface_voxels, stats.target_voxels, stats.voxels_visited
    );

    // Step 3: One vertex per kept point
    println!("\nStep 3: Assembling point set...");
    let cloud = masking::mask_points(
        cloud,
        MaskOptions {
            on_ratio: args.on_ratio,
            max_points: args.max_points,
        },
    )?;

    // Step 4: LPS -> output convention
    println!("\nStep 4: Transforming points to {}...", system);
    let cloud = transform::convert_cloud(cloud, system);

    // Step 5: Export
    println!("\nStep 5: Writing point cloud...");
    if cloud.is_empty() {
        log::warn!("No interface points found; writing an empty point set");
    }
    let mut outputs = Vec::new();
    for (format, path) in output_paths(&args.output, args.output_format()) {
        match format {
            OutputFormat::Vtk => export_vtk::export_vtk(&cloud, &path, args.label_array)?,
            _ => export_vtp::export_vtp(&cloud, &path, args.label_array)?,
        }
        println!("Saved point cloud to: {}", path.display());
        outputs.push(path);
    }

    let report = ExtractionReport {
        input: args.input.clone(),
        outputs,
        target_labels: targets.iter().collect(),
        mode,
        coordinate_system: system,
        dimensions: volume.dims(),
        stats,
        points_written: cloud.len(),
        bounds: cloud.bounds(),
    };
    if let Some(path) = &args.report {
        report.save(path)?;
    }
    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("SegCloud - Segment Interface Extraction");
    println!("=======================================");
    println!("Input: {}", args.input.display());
    println!("Labels: {:?}", args.labels);
    println!("Output: {}", args.output.display());
    println!("Mode: {}", args.interface_mode());
    println!("Coordinates: {:?}", args.coordinates);
    println!();

    let report = run(&args)?;

    println!("\nWrote {} point(s) to {} file(s)", report.points_written, report.outputs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use segcloud_common::metaimage::write_mha;
    use segcloud_common::{ImageGeometry, LabelVolume};
    use std::ffi::OsString;

    #[test]
    fn parses_repeated_and_comma_separated_labels() {
        let args = Args::try_parse_from(["segcloud", "-i", "seg.mha", "-l", "3", "-l", "5,7"]).unwrap();
        assert_eq!(args.labels, vec![3, 5, 7]);
        assert_eq!(args.output, PathBuf::from("interface.vtp"));
        assert_eq!(args.interface_mode(), InterfaceMode::Segments);
        assert_eq!(args.output_format(), OutputFormat::Vtp);
    }

    #[test]
    fn label_is_required() {
        assert!(Args::try_parse_from(["segcloud", "-i", "seg.mha"]).is_err());
    }

    #[test]
    fn contour_switch_and_mode() {
        let args = Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "-c"]).unwrap();
        assert_eq!(args.interface_mode(), InterfaceMode::Contour);

        let args = Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "--mode", "background"]).unwrap();
        assert_eq!(args.interface_mode(), InterfaceMode::Background);

        assert!(Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "-c", "--mode", "segments"]).is_err());
    }

    #[test]
    fn format_from_flag_or_extension() {
        let args = Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "-o", "cloud.vtk"]).unwrap();
        assert_eq!(args.output_format(), OutputFormat::Vtk);

        let args = Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "-o", "cloud.vtk", "-f", "vtp"]).unwrap();
        assert_eq!(args.output_format(), OutputFormat::Vtp);

        let paths = output_paths(Path::new("out/cloud.vtp"), OutputFormat::Both);
        assert_eq!(paths[0], (OutputFormat::Vtp, PathBuf::from("out/cloud.vtp")));
        assert_eq!(paths[1], (OutputFormat::Vtk, PathBuf::from("out/cloud.vtk")));
    }

    #[test]
    fn single_format_output_gets_matching_extension() {
        let args = Args::try_parse_from(["segcloud", "-i", "s.mha", "-l", "1", "-o", "cloud.vtp", "-f", "vtk"]).unwrap();
        let paths = output_paths(&args.output, args.output_format());
        assert_eq!(paths, vec![(OutputFormat::Vtk, PathBuf::from("cloud.vtk"))]);

        let paths = output_paths(Path::new("out/cloud"), OutputFormat::Vtp);
        assert_eq!(paths, vec![(OutputFormat::Vtp, PathBuf::from("out/cloud.vtp"))]);
    }

    #[test]
    fn end_to_end_two_segments() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("seg.mha");
        let output = dir.path().join("cloud.vtp");
        let report_path = dir.path().join("report.json");

        // label 1 for x < 2, label 2 for x >= 2, one voxel of background padding along z
        let mut volume = LabelVolume::zeros([4, 2, 3], ImageGeometry::new([10.0, 20.0, 30.0], [1.0; 3]));
        for j in 0..2 {
            for i in 0..4 {
                volume.set(i, j, 1, if i < 2 { 1 } else { 2 });
            }
        }
        write_mha(&volume, &input, false).unwrap();

        let argv: Vec<OsString> = vec![
            "segcloud".into(),
            "-i".into(),
            input.clone().into(),
            "-l".into(),
            "1".into(),
            "-o".into(),
            output.clone().into(),
            "-f".into(),
            "both".into(),
            "--report".into(),
            report_path.clone().into(),
        ];
        let args = Args::try_parse_from(argv).unwrap();
        let report = run(&args).unwrap();

        assert_eq!(report.stats.target_voxels, 4);
        assert_eq!(report.stats.interface_voxels, 2);
        assert_eq!(report.points_written, 2);
        assert_eq!(report.coordinate_system, CoordinateSystem::Ras);
        // LPS (11, 20, 31) in RAS
        let (min, _) = report.bounds.unwrap();
        assert_eq!((min.x, min.y, min.z), (-11.0, -21.0, 31.0));

        assert!(output.exists());
        assert!(output.with_extension("vtk").exists());
        assert!(report_path.exists());

        let legacy = std::fs::read_to_string(output.with_extension("vtk")).unwrap();
        assert!(legacy.contains("POINTS 2 float\n-11 -20 31\n-11 -21 31\n"));
    }
}
