//! PDF rendering for sticker sheets
//!
//! This module handles all PDF-specific operations:
//! - Encoding composites as image XObjects
//! - Building one output page per sheet page
//! - Drawing cut lines between split slots

mod marks;
pub mod pdf;

pub use marks::cut_line_ops;
pub use pdf::*;
