// MetaImage codec
// Reads and writes 3D label volumes as .mha (header + LOCAL data) or .mhd (detached data)

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::Label;
use crate::volume::{ImageGeometry, LabelVolume};

#[derive(Debug, Error)]
pub enum MetaImageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing header field {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },
    #[error("unsupported element type {0}")]
    UnsupportedElementType(String),
    #[error("only 3D images are supported, got {0} dimension(s)")]
    UnsupportedDimensions(usize),
    #[error("only single-channel images are supported, got {0} channels")]
    UnsupportedChannels(usize),
    #[error("pixel data holds {actual} bytes, expected {expected}")]
    DataSize { expected: usize, actual: usize },
    #[error("failed to decompress pixel data: {0}")]
    Decompress(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetaImageError>;

/// Pixel types of the MetaIO format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ElementType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "MET_CHAR" => Ok(ElementType::Char),
            "MET_UCHAR" => Ok(ElementType::UChar),
            "MET_SHORT" => Ok(ElementType::Short),
            "MET_USHORT" => Ok(ElementType::UShort),
            "MET_INT" | "MET_LONG" => Ok(ElementType::Int),
            "MET_UINT" | "MET_ULONG" => Ok(ElementType::UInt),
            "MET_FLOAT" => Ok(ElementType::Float),
            "MET_DOUBLE" => Ok(ElementType::Double),
            other => Err(MetaImageError::UnsupportedElementType(other.to_string())),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ElementType::Char | ElementType::UChar => 1,
            ElementType::Short | ElementType::UShort => 2,
            ElementType::Int | ElementType::UInt | ElementType::Float => 4,
            ElementType::Double => 8,
        }
    }

    /// Decode one element and narrow it to a label (rounded, saturating)
    fn decode(&self, bytes: &[u8], msb: bool) -> Label {
        macro_rules! read {
            ($t:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                if msb {
                    <$t>::from_be_bytes(buf)
                } else {
                    <$t>::from_le_bytes(buf)
                }
            }};
        }
        let value: f64 = match self {
            ElementType::Char => bytes[0] as i8 as f64,
            ElementType::UChar => bytes[0] as f64,
            ElementType::Short => return read!(i16, 2),
            ElementType::UShort => read!(u16, 2) as f64,
            ElementType::Int => read!(i32, 4) as f64,
            ElementType::UInt => read!(u32, 4) as f64,
            ElementType::Float => read!(f32, 4) as f64,
            ElementType::Double => read!(f64, 8),
        };
        value.round() as Label
    }
}

/// Parsed MetaImage header
#[derive(Debug, Clone, PartialEq)]
pub struct MetaImageHeader {
    pub dims: [usize; 3],
    pub element_type: ElementType,
    pub geometry: ImageGeometry,
    pub msb: bool,
    pub compressed: bool,
    /// `None` for LOCAL data
    pub data_file: Option<String>,
    /// Bytes to skip at the start of a detached data file, -1 means the data sits at its end
    pub header_size: Option<i64>,
}

impl MetaImageHeader {
    /// Uncompressed pixel data size in bytes, None on overflow
    pub fn data_len(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(self.element_type.size(), |acc, &d| acc.checked_mul(d))
    }

    /// Strip the preamble of a detached data file
    fn skip_preamble(&self, raw: Vec<u8>, expected: usize) -> Result<Vec<u8>> {
        match self.header_size {
            None | Some(0) => Ok(raw),
            Some(-1) if self.compressed => Err(invalid("HeaderSize", "-1 with compressed data")),
            Some(-1) => {
                if raw.len() < expected {
                    return Err(MetaImageError::DataSize {
                        expected,
                        actual: raw.len(),
                    });
                }
                Ok(raw[raw.len() - expected..].to_vec())
            }
            Some(skip) if skip > 0 => {
                let skip = skip as usize;
                if raw.len() < skip {
                    return Err(MetaImageError::DataSize {
                        expected: skip,
                        actual: raw.len(),
                    });
                }
                Ok(raw[skip..].to_vec())
            }
            Some(other) => Err(invalid("HeaderSize", &other.to_string())),
        }
    }
}

/// Read a MetaImage file into a label volume
pub fn read_metaimage(path: &Path) -> Result<LabelVolume> {
    let bytes = fs::read(path).map_err(|source| MetaImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (header, data_start) = parse_header(&bytes)?;
    let expected = header
        .data_len()
        .ok_or_else(|| invalid("DimSize", &format!("{:?}", header.dims)))?;

    log::debug!(
        "MetaImage {}: dims {:?}, {:?}, compressed={}, msb={}",
        path.display(),
        header.dims,
        header.element_type,
        header.compressed,
        header.msb
    );

    let raw = match &header.data_file {
        None => bytes[data_start..].to_vec(),
        Some(file) => {
            let data_path = path.parent().unwrap_or_else(|| Path::new(".")).join(file);
            let raw = fs::read(&data_path).map_err(|source| MetaImageError::Io {
                path: data_path,
                source,
            })?;
            header.skip_preamble(raw, expected)?
        }
    };

    let raw = if header.compressed {
        let mut decoded = Vec::new();
        ZlibDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(MetaImageError::Decompress)?;
        decoded
    } else {
        raw
    };

    decode_volume(&header, &raw)
}

fn decode_volume(header: &MetaImageHeader, raw: &[u8]) -> Result<LabelVolume> {
    let element_size = header.element_type.size();
    let expected = header
        .data_len()
        .ok_or_else(|| invalid("DimSize", &format!("{:?}", header.dims)))?;
    if raw.len() < expected {
        return Err(MetaImageError::DataSize {
            expected,
            actual: raw.len(),
        });
    }

    let voxels: Vec<Label> = raw[..expected]
        .chunks_exact(element_size)
        .map(|chunk| header.element_type.decode(chunk, header.msb))
        .collect();

    LabelVolume::from_raster(header.dims, voxels, header.geometry).ok_or(MetaImageError::DataSize {
        expected,
        actual: raw.len(),
    })
}

/// Parse "Key = Value" lines up to and including ElementDataFile.
/// Returns the header and the offset of the first data byte.
pub fn parse_header(bytes: &[u8]) -> Result<(MetaImageHeader, usize)> {
    let mut ndims: Option<usize> = None;
    let mut dims: Option<Vec<usize>> = None;
    let mut element_type: Option<ElementType> = None;
    let mut spacing: Option<Vec<f64>> = None;
    let mut origin: Option<Vec<f64>> = None;
    let mut transform: Option<Vec<f64>> = None;
    let mut msb = false;
    let mut compressed = false;
    let mut data_file: Option<Option<String>> = None;
    let mut header_size: Option<i64> = None;

    let mut offset = 0;
    while offset < bytes.len() && data_file.is_none() {
        let line_end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p)
            .unwrap_or(bytes.len());
        let line = String::from_utf8_lossy(&bytes[offset..line_end]);
        offset = (line_end + 1).min(bytes.len());

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "NDims" => ndims = Some(parse_scalar(key, value)?),
            "DimSize" => dims = Some(parse_list(key, value)?),
            "ElementType" => element_type = Some(ElementType::parse(value)?),
            "ElementSpacing" => spacing = Some(parse_list(key, value)?),
            "Offset" | "Origin" | "Position" => origin = Some(parse_list(key, value)?),
            "TransformMatrix" | "Rotation" | "Orientation" => transform = Some(parse_list(key, value)?),
            "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => msb = parse_bool(key, value)?,
            "CompressedData" => compressed = parse_bool(key, value)?,
            "HeaderSize" => header_size = Some(parse_scalar(key, value)?),
            "ElementNumberOfChannels" => {
                let channels: usize = parse_scalar(key, value)?;
                if channels != 1 {
                    return Err(MetaImageError::UnsupportedChannels(channels));
                }
            }
            "ObjectType" if value != "Image" => {
                return Err(invalid(key, value));
            }
            "ElementDataFile" => {
                data_file = Some(match value {
                    "LOCAL" => None,
                    file => Some(file.to_string()),
                });
            }
            _ => log::trace!("ignoring MetaImage field {}", key),
        }
    }

    let data_file = data_file.ok_or(MetaImageError::MissingField("ElementDataFile"))?;
    let dims = dims.ok_or(MetaImageError::MissingField("DimSize"))?;
    let ndims = ndims.unwrap_or(dims.len());
    if ndims != 3 || dims.len() != 3 {
        return Err(MetaImageError::UnsupportedDimensions(ndims.max(dims.len())));
    }
    let element_type = element_type.ok_or(MetaImageError::MissingField("ElementType"))?;

    let spacing = match spacing {
        Some(s) => to_array3("ElementSpacing", &s)?,
        None => [1.0; 3],
    };
    let origin = match origin {
        Some(o) => to_array3("Offset", &o)?,
        None => [0.0; 3],
    };
    let direction = match transform {
        Some(m) if m.len() == 9 => {
            // each consecutive triple is the direction of one image axis
            let mut d = [[0.0; 3]; 3];
            for axis in 0..3 {
                for row in 0..3 {
                    d[row][axis] = m[axis * 3 + row];
                }
            }
            d
        }
        Some(m) => {
            return Err(invalid(
                "TransformMatrix",
                &m.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "),
            ))
        }
        None => ImageGeometry::IDENTITY_DIRECTION,
    };

    let header = MetaImageHeader {
        dims: [dims[0], dims[1], dims[2]],
        element_type,
        geometry: ImageGeometry::new(origin, spacing).with_direction(direction),
        msb,
        compressed,
        data_file,
        header_size,
    };
    if header.data_len().is_none() {
        return Err(invalid("DimSize", &format!("{:?}", header.dims)));
    }
    Ok((header, offset))
}

fn invalid(field: &str, value: &str) -> MetaImageError {
    MetaImageError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_scalar<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| invalid(field, value))
}

fn parse_list<T: std::str::FromStr>(field: &str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|v| v.parse().map_err(|_| invalid(field, value)))
        .collect()
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(field, value)),
    }
}

fn to_array3(field: &str, values: &[f64]) -> Result<[f64; 3]> {
    match values {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(invalid(
            field,
            &values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "),
        )),
    }
}

/// Write a label volume as a single-file .mha with MET_SHORT little-endian data
pub fn write_mha(volume: &LabelVolume, path: &Path, compress: bool) -> Result<()> {
    let io_err = |source| MetaImageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut data: Vec<u8> = Vec::with_capacity(volume.voxel_count() * 2);
    for label in volume.to_raster() {
        data.extend_from_slice(&label.to_le_bytes());
    }
    if compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data).map_err(io_err)?;
        data = encoder.finish().map_err(io_err)?;
    }

    let g = &volume.geometry;
    let [nx, ny, nz] = volume.dims();
    let mut transform = Vec::with_capacity(9);
    for axis in 0..3 {
        for row in 0..3 {
            transform.push(g.direction[row][axis].to_string());
        }
    }

    let mut header = String::new();
    header.push_str("ObjectType = Image\n");
    header.push_str("NDims = 3\n");
    header.push_str("BinaryData = True\n");
    header.push_str("BinaryDataByteOrderMSB = False\n");
    header.push_str(&format!("CompressedData = {}\n", if compress { "True" } else { "False" }));
    if compress {
        header.push_str(&format!("CompressedDataSize = {}\n", data.len()));
    }
    header.push_str(&format!("TransformMatrix = {}\n", transform.join(" ")));
    header.push_str(&format!("Offset = {} {} {}\n", g.origin[0], g.origin[1], g.origin[2]));
    header.push_str(&format!("ElementSpacing = {} {} {}\n", g.spacing[0], g.spacing[1], g.spacing[2]));
    header.push_str(&format!("DimSize = {} {} {}\n", nx, ny, nz));
    header.push_str("ElementType = MET_SHORT\n");
    header.push_str("ElementDataFile = LOCAL\n");

    let mut file = fs::File::create(path).map_err(io_err)?;
    file.write_all(header.as_bytes()).map_err(io_err)?;
    file.write_all(&data).map_err(io_err)?;

    log::info!(
        "Wrote MetaImage {} ({}x{}x{}, {} bytes of pixel data)",
        path.display(),
        nx,
        ny,
        nz,
        data.len()
    );
    Ok(())
}
