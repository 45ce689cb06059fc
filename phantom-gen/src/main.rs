use anyhow::{bail, Result};
use clap::Parser;
use segcloud_common::metaimage::write_mha;
use std::path::PathBuf;

mod phantom;

use phantom::{background_fraction, count_label, generate_sphere_phantom, PhantomConfig};

/// Generate labeled sphere phantoms for testing segment interface extraction
#[derive(Parser, Debug)]
#[command(name = "phantom-gen")]
#[command(about = "Generate labeled sphere phantoms as MetaImage volumes", long_about = None)]
struct Args {
    /// Output MetaImage file path
    #[arg(short, long, default_value = "phantom.mha")]
    output: PathBuf,

    /// Grid size in voxels (x,y,z)
    #[arg(short, long, value_delimiter = ',', default_values = ["64", "64", "64"])]
    dims: Vec<usize>,

    /// Voxel spacing in millimeters (x,y,z)
    #[arg(short, long, value_delimiter = ',', default_values = ["1", "1", "1"])]
    spacing: Vec<f64>,

    /// Physical position of the first voxel in millimeters (x,y,z)
    #[arg(long, value_delimiter = ',', default_values = ["0", "0", "0"], allow_hyphen_values = true)]
    origin: Vec<f64>,

    /// Sphere radius in millimeters
    #[arg(short, long, default_value = "24.0")]
    radius: f64,

    /// Number of wedge segments
    #[arg(short = 'n', long, default_value = "4")]
    segments: usize,

    /// Zlib-compress the pixel data
    #[arg(short, long)]
    compress: bool,
}

fn triple<T: Copy>(name: &str, values: &[T]) -> Result<[T; 3]> {
    match values {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => bail!("--{} expects exactly 3 values, got {}", name, values.len()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = PhantomConfig {
        dims: triple("dims", &args.dims)?,
        spacing: triple("spacing", &args.spacing)?,
        origin: triple("origin", &args.origin)?,
        radius_mm: args.radius,
        segments: args.segments,
    };

    println!("Generating sphere phantom:");
    println!("  Grid: {:?} voxels", config.dims);
    println!("  Spacing: {:?} mm", config.spacing);
    println!("  Radius: {}mm", config.radius_mm);
    println!("  Segments: {}", config.segments);
    println!("  Output: {}", args.output.display());

    let volume = generate_sphere_phantom(&config)?;
    for label in 1..=config.segments as i16 {
        println!("  Label {}: {} voxel(s)", label, count_label(&volume, label));
    }
    println!("  Background: {:.1}%", background_fraction(&volume) * 100.0);

    write_mha(&volume, &args.output, args.compress)?;

    println!("✓ Phantom written: {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_triples() {
        let args = Args::try_parse_from([
            "phantom-gen", "-d", "10,20,30", "-s", "0.5,0.5,2", "--origin", "-5,0,5", "-n", "3",
        ])
        .unwrap();
        assert_eq!(triple("dims", &args.dims).unwrap(), [10, 20, 30]);
        assert_eq!(triple("spacing", &args.spacing).unwrap(), [0.5, 0.5, 2.0]);
        assert_eq!(triple("origin", &args.origin).unwrap(), [-5.0, 0.0, 5.0]);
        assert_eq!(args.segments, 3);
    }

    #[test]
    fn triple_rejects_wrong_length() {
        assert!(triple("dims", &[1usize, 2]).is_err());
    }

    #[test]
    fn generated_phantom_round_trips_through_metaimage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phantom.mha");
        let config = PhantomConfig {
            dims: [12, 12, 12],
            radius_mm: 4.0,
            segments: 2,
            ..Default::default()
        };
        let volume = generate_sphere_phantom(&config).unwrap();
        write_mha(&volume, &path, true).unwrap();

        let read = segcloud_common::metaimage::read_metaimage(&path).unwrap();
        assert_eq!(read, volume);
    }
}
