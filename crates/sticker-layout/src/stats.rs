use crate::config::PaperConfig;
use crate::layout::{GridCell, pack_cells, paginate};
use crate::types::*;
use crate::unit::ImageUnit;

/// Calculate packing statistics for `units` on sheets described by `config`
pub fn calculate_statistics(units: &[ImageUnit], config: &PaperConfig) -> Result<SheetStatistics> {
    let geometry = config.geometry()?;
    let cells = pack_cells(units, config);

    let mut full_cells = 0;
    let mut split_cells = 0;
    let mut empty_slots = 0;
    for cell in &cells {
        match cell {
            GridCell::Full(_) => full_cells += 1,
            GridCell::Split { slot2, .. } => {
                split_cells += 1;
                if slot2.is_none() {
                    empty_slots += 1;
                }
            }
        }
    }

    let cell_count = cells.len();
    let pages = paginate(cells, geometry.cells_per_page()).len();

    Ok(SheetStatistics {
        units: units.len(),
        placements: units.iter().map(|unit| unit.quantity).sum(),
        cells: cell_count,
        full_cells,
        split_cells,
        empty_slots,
        pages,
        cells_per_page: geometry.cells_per_page(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(quantity: usize, size: StickerSize) -> ImageUnit {
        ImageUnit::from_bytes("u", Vec::new())
            .with_quantity(quantity)
            .with_sticker_size(size)
    }

    #[test]
    fn test_mixed_sizes() {
        let units = vec![unit(3, StickerSize::Half), unit(2, StickerSize::Full)];
        let stats = calculate_statistics(&units, &PaperConfig::default()).unwrap();

        assert_eq!(stats.units, 2);
        assert_eq!(stats.placements, 5);
        assert_eq!(stats.cells, 4);
        assert_eq!(stats.split_cells, 2);
        assert_eq!(stats.full_cells, 2);
        assert_eq!(stats.empty_slots, 1);
        assert_eq!(stats.pages, 1);
        assert!((stats.fill_ratio() - 4.0 / 18.0).abs() < 1e-6);
    }

    #[test]
    fn test_spills_onto_second_page() {
        let units = vec![unit(37, StickerSize::Half)];
        let stats = calculate_statistics(&units, &PaperConfig::default()).unwrap();

        assert_eq!(stats.cells, 19);
        assert_eq!(stats.pages, 2);
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let stats = calculate_statistics(&[], &PaperConfig::default()).unwrap();
        assert_eq!(stats.cells, 0);
        assert_eq!(stats.pages, 1);
        assert_eq!(stats.fill_ratio(), 0.0);
    }
}
