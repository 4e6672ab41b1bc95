//! Layout data types
//!
//! These types represent the intermediate results between the image list
//! and the two renderers (preview and PDF).

use crate::unit::UnitId;

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A rectangular area with a top-left origin, y growing downwards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (top edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Multiply every coordinate, e.g. to go from millimeters to pixels
    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

/// A straight segment, same coordinate space as [`Rect`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Line {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Line {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn scaled(&self, factor: f32) -> Line {
        Line::new(
            self.x1 * factor,
            self.y1 * factor,
            self.x2 * factor,
            self.y2 * factor,
        )
    }

    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }
}

/// The rectangle a placement is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSize {
    /// The whole grid cell
    Full,
    /// One slot of a split cell
    Half,
}

impl TargetSize {
    pub fn name(self) -> &'static str {
        match self {
            TargetSize::Full => "full",
            TargetSize::Half => "half",
        }
    }
}

/// Identity of one composited raster: the same unit at the same target
/// size always yields the same pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub unit_id: UnitId,
    pub target: TargetSize,
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.unit_id, self.target.name())
    }
}

/// One repetition of an image unit on the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Index of the unit in the list the cells were packed from
    pub unit_index: usize,
    pub unit_id: UnitId,
    pub target: TargetSize,
}

impl Placement {
    pub fn composite_key(&self) -> CompositeKey {
        CompositeKey {
            unit_id: self.unit_id.clone(),
            target: self.target,
        }
    }
}

/// One rectangle of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCell {
    /// The whole cell shows one placement
    Full(Placement),
    /// The cell is split; the second slot is empty when the half
    /// placements ran out
    Split {
        slot1: Placement,
        slot2: Option<Placement>,
    },
}

impl GridCell {
    pub fn is_split(&self) -> bool {
        matches!(self, GridCell::Split { .. })
    }

    /// Placements held by this cell, in slot order
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        let (first, second) = match self {
            GridCell::Full(p) => (p, None),
            GridCell::Split { slot1, slot2 } => (slot1, slot2.as_ref()),
        };
        std::iter::once(first).chain(second)
    }
}

/// A fixed-capacity, ordered run of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Zero-based page number
    pub index: usize,
    pub cells: Vec<GridCell>,
    /// cols × rows
    pub capacity: usize,
}

impl Page {
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at a page-local index; `None` for the empty tail of a short page
    pub fn cell_at(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index)
    }
}
