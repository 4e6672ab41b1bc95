//! Cut line rendering
//!
//! Generates PDF content stream operations for the dashed line separating
//! the two slots of a split cell.

use crate::constants::{CUT_LINE_DASH_MM, CUT_LINE_GRAY, CUT_LINE_WIDTH, mm_to_pt};
use crate::layout::Line;

/// Content stream operations stroking `line` as a light dashed cut line.
///
/// `line` is in sheet millimeters (top-left origin); `page_height_pt` flips
/// it into PDF user space.
pub fn cut_line_ops(line: &Line, page_height_pt: f32) -> String {
    let dash = mm_to_pt(CUT_LINE_DASH_MM);

    let mut ops = String::new();
    ops.push_str("q\n");
    ops.push_str(&format!("{} G\n", CUT_LINE_GRAY));
    ops.push_str(&format!("{} w\n", CUT_LINE_WIDTH));
    ops.push_str(&format!("[{} {}] 0 d\n", dash, dash));
    ops.push_str(&format!(
        "{} {} m {} {} l S\n",
        mm_to_pt(line.x1),
        page_height_pt - mm_to_pt(line.y1),
        mm_to_pt(line.x2),
        page_height_pt - mm_to_pt(line.y2)
    ));
    ops.push_str("Q\n");
    ops
}
