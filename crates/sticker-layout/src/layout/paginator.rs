//! Pagination of the packed cell stream

use super::{GridCell, Page};

/// Slice `cells` into consecutive pages of `cells_per_page`.
///
/// Page `k` holds cells `[k·N, (k+1)·N)`. An empty stream still yields one
/// blank page so there is always a sheet to show.
pub fn paginate(cells: Vec<GridCell>, cells_per_page: usize) -> Vec<Page> {
    let capacity = cells_per_page.max(1);

    if cells.is_empty() {
        return vec![Page {
            index: 0,
            cells: Vec::new(),
            capacity,
        }];
    }

    let mut pages = Vec::with_capacity(cells.len().div_ceil(capacity));
    let mut iter = cells.into_iter().peekable();
    while iter.peek().is_some() {
        pages.push(Page {
            index: pages.len(),
            cells: iter.by_ref().take(capacity).collect(),
            capacity,
        });
    }
    pages
}
