pub mod metaimage;
pub mod types;
pub mod volume;

pub use types::*;
pub use volume::{ImageGeometry, LabelVolume};
