//! Cell packing
//!
//! Turns the ordered image list into an ordered stream of grid cells.
//! Page boundaries are not known here.

use crate::config::PaperConfig;
use crate::types::{SlotCount, StickerSize};
use crate::unit::ImageUnit;

use super::{GridCell, Placement, TargetSize};

/// The rectangle a unit of `sticker_size` occupies under `slot_count`.
///
/// Without slot splitting every placement fills a whole cell.
pub fn target_for(sticker_size: StickerSize, slot_count: SlotCount) -> TargetSize {
    match (slot_count, sticker_size) {
        (SlotCount::One, _) | (_, StickerSize::Full) => TargetSize::Full,
        (SlotCount::Two, StickerSize::Half) => TargetSize::Half,
    }
}

/// Pack every placement of `units` into cells, in list order.
///
/// Half placements are paired strictly in encounter order. A full-size
/// placement flushes a pending half into a split cell with an empty second
/// slot before taking a cell of its own.
pub fn pack_cells(units: &[ImageUnit], config: &PaperConfig) -> Vec<GridCell> {
    let mut cells = Vec::new();
    let mut pending: Option<Placement> = None;

    for (unit_index, unit) in units.iter().enumerate() {
        let target = target_for(unit.sticker_size, config.slot_count);

        for _ in 0..unit.quantity {
            let placement = Placement {
                unit_index,
                unit_id: unit.id.clone(),
                target,
            };

            match target {
                TargetSize::Full => {
                    if let Some(slot1) = pending.take() {
                        cells.push(GridCell::Split { slot1, slot2: None });
                    }
                    cells.push(GridCell::Full(placement));
                }
                TargetSize::Half => match pending.take() {
                    Some(slot1) => cells.push(GridCell::Split {
                        slot1,
                        slot2: Some(placement),
                    }),
                    None => pending = Some(placement),
                },
            }
        }
    }

    if let Some(slot1) = pending {
        cells.push(GridCell::Split { slot1, slot2: None });
    }

    cells
}

// =============================================================================
// Tests
// =============================================================================
