use crate::highlight::contains_term;
use crate::index::VisibleIndex;
use crate::store::MessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn delta(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// incremental forward/backward search over the visible rows
///
/// The cursor remembers the last matched position and scans from there,
/// wrapping around the end of the sequence exactly once. A failed scan
/// leaves the position untouched.
#[derive(Debug, Default)]
pub(crate) struct SearchCursor {
    position: Option<usize>,
}

impl SearchCursor {
    pub(crate) fn position(&self) -> Option<usize> {
        self.position
    }

    pub(crate) fn reset(&mut self) {
        self.position = None;
    }

    /// remap the remembered position after a rebuild; `None` drops it
    pub(crate) fn set_position(&mut self, position: Option<usize>) {
        self.position = position;
    }

    /// scan for `term`, returning the matched row on success
    ///
    /// Visits every row at most once: starting just past the current
    /// position (or at the start/end of the sequence when there is none),
    /// stepping in `direction`, wrapping modulo the row count.
    pub(crate) fn find(
        &mut self,
        index: &VisibleIndex,
        store: &dyn MessageStore,
        term: &str,
        direction: Direction,
    ) -> Option<usize> {
        let len = index.len();
        if len == 0 || term.is_empty() {
            return None;
        }

        let anchor = match self.position {
            Some(p) => p as isize,
            // before the start / past the end, so the first probe lands on
            // the first / last row
            None => match direction {
                Direction::Forward => -1,
                Direction::Backward => len as isize,
            },
        };

        for step in 1..=len as isize {
            let candidate =
                (anchor + direction.delta() * step).rem_euclid(len as isize) as usize;
            let line = index.get(candidate)?.line;
            let text = store.text_of(line).unwrap_or("");
            if contains_term(text, term) {
                self.position = Some(candidate);
                return Some(candidate);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VisibleRow;
    use crate::store::LogBuffer;

    fn fixture(lines: &[&str]) -> (LogBuffer, VisibleIndex) {
        let mut store = LogBuffer::new();
        let mut index = VisibleIndex::default();
        for (i, text) in lines.iter().enumerate() {
            store.append(*text);
            index.push(VisibleRow::new(i, None));
        }
        (store, index)
    }

    #[test]
    fn test_forward_search_starts_at_first_row() {
        let (store, index) = fixture(&["alpha", "beta", "alpha"]);
        let mut cursor = SearchCursor::default();
        assert_eq!(cursor.find(&index, &store, "alpha", Direction::Forward), Some(0));
        assert_eq!(cursor.find(&index, &store, "alpha", Direction::Forward), Some(2));
    }

    #[test]
    fn test_backward_search_starts_at_last_row() {
        let (store, index) = fixture(&["alpha", "beta", "alpha"]);
        let mut cursor = SearchCursor::default();
        assert_eq!(cursor.find(&index, &store, "alpha", Direction::Backward), Some(2));
        assert_eq!(cursor.find(&index, &store, "alpha", Direction::Backward), Some(0));
    }

    #[test]
    fn test_wraps_exactly_once_then_gives_up() {
        let (store, index) = fixture(&["a", "b", "c"]);
        let mut cursor = SearchCursor::default();
        assert_eq!(cursor.find(&index, &store, "zzz", Direction::Forward), None);
        // failed scan leaves the position untouched
        assert_eq!(cursor.position(), None);
    }

    #[test]
    fn test_single_match_returns_to_itself_after_full_wrap() {
        let (store, index) = fixture(&["x", "needle", "y", "z"]);
        let mut cursor = SearchCursor::default();
        for _ in 0..=index.len() {
            assert_eq!(
                cursor.find(&index, &store, "needle", Direction::Forward),
                Some(1)
            );
        }
    }

    #[test]
    fn test_failed_search_keeps_previous_position() {
        let (store, index) = fixture(&["needle", "hay"]);
        let mut cursor = SearchCursor::default();
        cursor.find(&index, &store, "needle", Direction::Forward);
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(cursor.find(&index, &store, "zzz", Direction::Forward), None);
        assert_eq!(cursor.position(), Some(0));
    }

    #[test]
    fn test_empty_term_never_matches() {
        let (store, index) = fixture(&["anything"]);
        let mut cursor = SearchCursor::default();
        assert_eq!(cursor.find(&index, &store, "", Direction::Forward), None);
    }

    #[test]
    fn test_empty_index_never_matches() {
        let store = LogBuffer::new();
        let index = VisibleIndex::default();
        let mut cursor = SearchCursor::default();
        assert_eq!(cursor.find(&index, &store, "x", Direction::Forward), None);
    }
}
