//! Layout calculation modules
//!
//! This module handles all the geometric calculations for a sticker sheet:
//! - Geometry (cell and slot dimensions, millimeter positions)
//! - Cell packing (which placement goes into which cell)
//! - Pagination (which cells land on which page)

mod geometry;
mod packer;
mod paginator;
mod types;

pub use geometry::*;
pub use packer::*;
pub use paginator::*;
pub use types::*;
