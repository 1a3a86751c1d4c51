pub mod analysis;
pub mod common;
pub mod image;
pub mod segment;

pub use analysis::*;
pub use common::*;
pub use image::*;
pub use segment::*;
