use crate::error::{Error, Result};
use crate::highlight::{Highlight, highlights_for};
use crate::index::{HighlightCache, VisibleIndex, VisibleRow};
use crate::rules::RuleSet;
use crate::search::{Direction, SearchCursor};
use crate::selection::{SelectionInfo, SelectionTracker};
use crate::store::MessageStore;
use rayon::prelude::*;
use std::io;
use std::ops::Range;
use std::sync::Arc;

// lines classified per rayon batch during a rebuild
const REBUILD_CHUNK: usize = 8192;

/// change notification produced for the presentation layer
///
/// At most one event fires per `begin_update`/`end_update` batch; outside a
/// batch every mutation fires its own event. The event carries enough to
/// invalidate only the affected screen region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// rows appended at the end of the visible sequence
    Appended {
        rows: Range<usize>,
        /// the stick-to-bottom policy wants the view scrolled to the new end
        scroll_to_bottom: bool,
    },
    /// the whole sequence was re-derived; all cached row state is stale
    Rebuilt,
    /// everything was dropped
    Cleared,
}

/// coalesced event state while a batch is open
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Pending {
    #[default]
    Nothing,
    Appended {
        first: usize,
        count: usize,
    },
    Rebuilt,
    Cleared,
}

impl Pending {
    fn note_append(&mut self, row: usize) {
        *self = match *self {
            Pending::Nothing => Pending::Appended {
                first: row,
                count: 1,
            },
            Pending::Appended { first, count } => Pending::Appended {
                first,
                count: count + 1,
            },
            // a structural change already forces a full repaint
            Pending::Rebuilt | Pending::Cleared => Pending::Rebuilt,
        };
    }

    fn note_rebuilt(&mut self) {
        *self = Pending::Rebuilt;
    }

    fn note_cleared(&mut self) {
        *self = Pending::Cleared;
    }
}

/// the filter/highlight/virtualization engine over one log stream
///
/// This is the single-owner aggregate the presentation layer talks to: it
/// holds the active rule-set snapshot, the visible-row index, the selection,
/// the search cursor, and the update-batching state. It never owns the
/// message store; callers pass the store into the operations that read line
/// text.
///
/// All methods take `&mut self` or `&self`; the structure is not designed
/// for concurrent mutation. High-rate producers are expected to batch their
/// appends between [`begin_update`](LogView::begin_update) and
/// [`end_update`](LogView::end_update) so the presentation layer is not
/// forced into one repaint per line.
pub struct LogView {
    rules: Arc<RuleSet>,
    rules_gen: u64,
    applied_gen: u64,
    /// how far through the store classification has progressed
    scanned_lines: usize,
    index: VisibleIndex,
    selection: SelectionTracker,
    cursor: SearchCursor,
    search_term: String,
    search_gen: u64,
    viewport_top: usize,
    viewport_height: usize,
    auto_scroll: bool,
    update_depth: u32,
    pending: Pending,
    on_change: Option<Box<dyn FnMut(Change)>>,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl LogView {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
            rules_gen: 0,
            applied_gen: 0,
            scanned_lines: 0,
            index: VisibleIndex::default(),
            selection: SelectionTracker::default(),
            cursor: SearchCursor::default(),
            search_term: String::new(),
            search_gen: 0,
            viewport_top: 0,
            viewport_height: 0,
            auto_scroll: true,
            update_depth: 0,
            pending: Pending::default(),
            on_change: None,
        }
    }

    /// register the "index changed" callback
    pub fn set_on_change(&mut self, handler: impl FnMut(Change) + 'static) {
        self.on_change = Some(Box::new(handler));
    }

    // ------------------------------------------------------------------
    // rule set
    // ------------------------------------------------------------------

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// swap in a new rule-set snapshot
    ///
    /// The visible sequence is not touched until
    /// [`apply_filters`](LogView::apply_filters) runs; the append path picks
    /// up the new snapshot immediately. Swapping the whole `Arc` means a
    /// rebuild always evaluates one consistent rule-set version.
    pub fn set_rules(&mut self, rules: RuleSet) {
        self.rules = Arc::new(rules);
        self.rules_gen += 1;
    }

    /// true when an enabled Track rule matches; collaborator-side behavior
    pub fn is_track_match(&self, text: &str) -> bool {
        self.rules.is_track_match(text)
    }

    /// true when an enabled Stop rule matches; collaborator-side behavior
    pub fn is_stop_match(&self, text: &str) -> bool {
        self.rules.is_stop_match(text)
    }

    // ------------------------------------------------------------------
    // ingestion
    // ------------------------------------------------------------------

    /// classify one appended line; record it if visible
    ///
    /// Returns whether the line became a visible row. O(1) amortized; the
    /// store has already been appended to by the caller, `line` is its line
    /// number there.
    pub fn append(&mut self, line: usize, text: &str) -> bool {
        self.scanned_lines = self.scanned_lines.max(line + 1);

        let classification = self.rules.classify(text);
        if !classification.visible {
            return false;
        }

        let row = self.index.len();
        self.index.push(VisibleRow::new(line, classification.color));
        self.pending.note_append(row);
        if self.update_depth == 0 {
            self.flush_pending();
        }
        true
    }

    /// re-derive the whole visible sequence from the store
    ///
    /// O(total lines); classification runs rayon-parallel in fixed chunks,
    /// preserving the store's append order. Selection and search position
    /// survive through their underlying line numbers; rows that fell out of
    /// the filter drop out of both. Returns `false` when nothing changed
    /// since the last full scan (same rule-set generation, same line count):
    /// a burst of redundant rebuild requests collapses to one real rebuild,
    /// the newest rule set always winning.
    pub fn apply_filters(&mut self, store: &dyn MessageStore) -> bool {
        let count = store.line_count();
        if self.applied_gen == self.rules_gen && self.scanned_lines == count {
            log::debug!("apply_filters: rule set unchanged, skipping rebuild");
            return false;
        }

        let rules = Arc::clone(&self.rules);
        let generation = self.rules_gen;

        let mut rows = Vec::new();
        let mut start = 0;
        while start < count {
            let end = (start + REBUILD_CHUNK).min(count);
            let chunk: Vec<VisibleRow> = (start..end)
                .into_par_iter()
                .filter_map(|line| {
                    let text = store.text_of(line).unwrap_or("");
                    let classification = rules.classify(text);
                    classification
                        .visible
                        .then(|| VisibleRow::new(line, classification.color))
                })
                .collect();
            rows.extend(chunk);
            start = end;
        }

        // remap selection and search position through the stable line numbers
        let selected_lines: Vec<usize> = self
            .selection
            .iter()
            .filter_map(|i| self.index.get(i))
            .map(|r| r.line)
            .collect();
        let cursor_line = self
            .cursor
            .position()
            .and_then(|i| self.index.get(i))
            .map(|r| r.line);

        self.index.replace(rows);
        self.scanned_lines = count;
        self.applied_gen = generation;

        self.selection.replace(
            selected_lines
                .iter()
                .filter_map(|&line| self.index.position_of_line(line)),
        );
        self.cursor
            .set_position(cursor_line.and_then(|line| self.index.position_of_line(line)));

        self.pending.note_rebuilt();
        if self.update_depth == 0 {
            self.flush_pending();
        }
        true
    }

    /// drop all rows, selection and search state
    ///
    /// Pairs with a `Clear` of the message store; the caller wipes the store,
    /// the view wipes everything derived from it.
    pub fn clear(&mut self) {
        self.index.clear();
        self.selection.clear();
        self.cursor.reset();
        self.scanned_lines = 0;
        self.viewport_top = 0;
        self.pending.note_cleared();
        if self.update_depth == 0 {
            self.flush_pending();
        }
    }

    // ------------------------------------------------------------------
    // update batching
    // ------------------------------------------------------------------

    /// suppress change notifications until the matching
    /// [`end_update`](LogView::end_update); nests
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    /// close a batch; at the outermost level, fire the coalesced event
    pub fn end_update(&mut self) {
        debug_assert!(self.update_depth > 0, "end_update without begin_update");
        self.update_depth = self.update_depth.saturating_sub(1);
        if self.update_depth == 0 {
            self.flush_pending();
        }
    }

    fn flush_pending(&mut self) {
        let change = match std::mem::take(&mut self.pending) {
            Pending::Nothing => return,
            Pending::Appended { first, count } => Change::Appended {
                rows: first..first + count,
                // stick to bottom while tailing: the policy is on and either
                // nothing is selected or the selection was on the previously
                // last row (`first` is the old row count)
                scroll_to_bottom: self.auto_scroll
                    && (self.selection.is_empty()
                        || self.selection.is_last_row_selected(first)),
            },
            Pending::Rebuilt => Change::Rebuilt,
            Pending::Cleared => Change::Cleared,
        };
        if let Some(handler) = self.on_change.as_mut() {
            handler(change);
        }
    }

    // ------------------------------------------------------------------
    // row access
    // ------------------------------------------------------------------

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    /// the visible row at `index`; fails fast outside `[0, row_count())`
    pub fn row(&self, index: usize) -> Result<&VisibleRow> {
        self.index.get(index).ok_or(Error::InvalidIndex {
            index,
            count: self.index.len(),
        })
    }

    /// the stored text behind visible row `index`
    pub fn row_text<'s>(&self, index: usize, store: &'s dyn MessageStore) -> Result<&'s str> {
        let row = self.row(index)?;
        // line-count shrink in the store reads as an empty line
        Ok(store.text_of(row.line).unwrap_or(""))
    }

    /// highlight spans for visible row `index` under the active search term
    ///
    /// Computed lazily and cached per row; the cache is keyed by the search
    /// generation, so a term change invalidates every row at once without
    /// touching them.
    pub fn highlights_at(
        &mut self,
        index: usize,
        store: &dyn MessageStore,
    ) -> Result<&[Highlight]> {
        let count = self.index.len();
        let row = self
            .index
            .get_mut(index)
            .ok_or(Error::InvalidIndex { index, count })?;

        let stale = row
            .cache
            .as_ref()
            .is_none_or(|c| c.generation != self.search_gen);
        if stale {
            let text = store.text_of(row.line).unwrap_or("");
            row.cache = Some(HighlightCache {
                generation: self.search_gen,
                spans: highlights_for(text, &self.search_term),
            });
        }

        Ok(row.cache.as_ref().map_or(&[], |c| c.spans.as_slice()))
    }

    // ------------------------------------------------------------------
    // search
    // ------------------------------------------------------------------

    /// set the ad-hoc highlight/search term
    ///
    /// Invalidates cached highlight spans (by generation bump) but leaves
    /// the search cursor position alone.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term != self.search_term {
            self.search_term = term;
            self.search_gen += 1;
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// current search position among the visible rows
    pub fn search_position(&self) -> Option<usize> {
        self.cursor.position()
    }

    /// scan forward for `term`, wrapping once; selects the hit
    pub fn find_next(&mut self, term: &str, store: &dyn MessageStore) -> bool {
        self.find(term, store, Direction::Forward)
    }

    /// scan backward for `term`, wrapping once; selects the hit
    pub fn find_previous(&mut self, term: &str, store: &dyn MessageStore) -> bool {
        self.find(term, store, Direction::Backward)
    }

    fn find(&mut self, term: &str, store: &dyn MessageStore, direction: Direction) -> bool {
        match self.cursor.find(&self.index, store, term, direction) {
            Some(row) => {
                self.selection.select_only(row);
                true
            }
            // no match after a full wrap: position and selection untouched
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // selection
    // ------------------------------------------------------------------

    /// add rows to the selection; every index is validated first
    pub fn select(&mut self, indices: &[usize]) -> Result<()> {
        let count = self.index.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
            return Err(Error::InvalidIndex { index: bad, count });
        }
        self.selection.select(indices.iter().copied());
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.index.len());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// selected visible-row indices, ascending
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selection.indices()
    }

    /// min, max and count over the selected rows
    pub fn selected_range(&self) -> SelectionInfo {
        self.selection.range()
    }

    /// used by the append path to decide whether to keep tailing
    pub fn is_last_row_selected(&self) -> bool {
        self.selection.is_last_row_selected(self.index.len())
    }

    // ------------------------------------------------------------------
    // viewport / scroll policy
    // ------------------------------------------------------------------

    /// the presentation layer reports what it currently shows
    pub fn set_viewport(&mut self, top: usize, height: usize) {
        self.viewport_top = top;
        self.viewport_height = height;
    }

    /// first row on screen, last row on screen, count on screen
    pub fn view_range(&self) -> SelectionInfo {
        let count = self.index.len();
        if count == 0 || self.viewport_height == 0 || self.viewport_top >= count {
            return SelectionInfo::default();
        }
        let end = (self.viewport_top + self.viewport_height).min(count) - 1;
        SelectionInfo::new(self.viewport_top, end, end - self.viewport_top + 1)
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn set_auto_scroll(&mut self, enable: bool) {
        self.auto_scroll = enable;
    }

    // ------------------------------------------------------------------
    // export
    // ------------------------------------------------------------------

    /// write every visible row's text, one per line, in visible order
    ///
    /// The plain-text export contract: `text_of(line)` per visible row,
    /// newline-terminated, ascending, no filter or highlight metadata.
    pub fn export_visible<W: io::Write>(
        &self,
        store: &dyn MessageStore,
        out: &mut W,
    ) -> io::Result<()> {
        for row in self.index.iter() {
            writeln!(out, "{}", store.text_of(row.line).unwrap_or(""))?;
        }
        Ok(())
    }
}
