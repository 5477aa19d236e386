use std::collections::BTreeSet;

/// contiguous-range summary over a set of visible rows
///
/// A computed value, regenerated on demand; never stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionInfo {
    pub begin: usize,
    pub end: usize,
    pub count: usize,
}

impl SelectionInfo {
    pub fn new(begin: usize, end: usize, count: usize) -> Self {
        Self { begin, end, count }
    }
}

/// the set of selected visible-row indices
///
/// Indices here are positions in the visible sequence, not line numbers;
/// they are only meaningful against one build of the index, so the view
/// remaps them through underlying line numbers whenever it rebuilds.
#[derive(Debug, Default)]
pub(crate) struct SelectionTracker {
    selected: BTreeSet<usize>,
}

impl SelectionTracker {
    pub(crate) fn select(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.selected.extend(indices);
    }

    /// drop everything and select exactly one row
    pub(crate) fn select_only(&mut self, index: usize) {
        self.selected.clear();
        self.selected.insert(index);
    }

    pub(crate) fn select_all(&mut self, row_count: usize) {
        self.selected = (0..row_count).collect();
    }

    pub(crate) fn clear(&mut self) {
        self.selected.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub(crate) fn indices(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// min, max and count over the selected rows
    pub(crate) fn range(&self) -> SelectionInfo {
        match (self.selected.first(), self.selected.last()) {
            (Some(&begin), Some(&end)) => SelectionInfo::new(begin, end, self.selected.len()),
            _ => SelectionInfo::default(),
        }
    }

    pub(crate) fn is_last_row_selected(&self, row_count: usize) -> bool {
        row_count > 0 && self.selected.contains(&(row_count - 1))
    }

    /// replace the set with remapped indices, dropping rows that vanished
    pub(crate) fn replace(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.selected = indices.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_range_summary() {
        let mut sel = SelectionTracker::default();
        sel.select([2, 5, 7]);
        assert_eq!(sel.range(), SelectionInfo::new(2, 7, 3));
    }

    #[test]
    fn test_empty_selection_has_default_range() {
        let sel = SelectionTracker::default();
        assert_eq!(sel.range(), SelectionInfo::default());
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut sel = SelectionTracker::default();
        sel.select_all(4);
        assert_eq!(sel.indices(), vec![0, 1, 2, 3]);
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn test_indices_are_ordered_and_deduplicated() {
        let mut sel = SelectionTracker::default();
        sel.select([7, 2, 5, 2]);
        assert_eq!(sel.indices(), vec![2, 5, 7]);
    }

    #[test]
    fn test_is_last_row_selected() {
        let mut sel = SelectionTracker::default();
        sel.select([3]);
        assert!(sel.is_last_row_selected(4));
        assert!(!sel.is_last_row_selected(5));
        assert!(!sel.is_last_row_selected(0));
    }

    #[test]
    fn test_select_only_replaces_the_set() {
        let mut sel = SelectionTracker::default();
        sel.select([1, 2, 3]);
        sel.select_only(9);
        assert_eq!(sel.indices(), vec![9]);
    }
}
