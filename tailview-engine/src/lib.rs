//! # tailview-engine
//!
//! The filter/highlight/virtualization engine behind a line-oriented log
//! viewer: it decides per line whether it is visible and what color it
//! takes, computes the highlight sub-ranges for an ad-hoc search term,
//! maintains a dense visible-row → underlying-line index that stays cheap
//! as the log grows unbounded, and runs incremental wrap-around search over
//! the visible rows.
//!
//! ## Overview
//!
//! The engine is presentation-neutral. A UI layer (any toolkit) composes
//! against [`LogView`] and only ever asks for the rows currently on screen:
//!
//! ```text
//! ┌─────────────┐  append(line, text)   ┌──────────────────┐
//! │ log source  │ ────────────────────> │     LogView      │
//! └─────────────┘                       │  rules snapshot  │
//!                                       │  visible index   │
//! ┌─────────────┐  row / row_text /     │  search cursor   │
//! │ UI layer    │ <──────────────────── │  selection       │
//! └─────────────┘  highlights_at(..)    └──────────────────┘
//! ```
//!
//! - **[`RuleSet`]** — ordered [`FilterRule`]s (include/exclude/track/stop/
//!   highlight); pure classification, rule order is authoritative.
//! - **[`highlights_for`]** — all non-overlapping occurrences of the search
//!   term within a line, as colored sub-ranges.
//! - **[`LogView`]** — the single-owner aggregate: visible-row index,
//!   selection, search cursor, viewport, update batching and the
//!   "index changed" notification.
//! - **[`MessageStore`]** — how the engine reads the append-only log it
//!   never owns; [`LogBuffer`] is the in-memory implementation.
//!
//! ## Virtualization contract
//!
//! [`LogView::row`] and [`LogView::row_count`] are O(1); a scroll view over
//! millions of lines renders by fetching only its on-screen slice. Appends
//! are O(1) amortized; a rule-set change triggers the one O(total lines)
//! operation, [`LogView::apply_filters`], which classifies rayon-parallel
//! in chunks and preserves append order.
//!
//! ## Batching
//!
//! A producer draining a burst wraps its appends in
//! [`LogView::begin_update`]/[`LogView::end_update`]; the presentation
//! layer then sees at most one coalesced [`Change`] per batch instead of
//! one repaint per line.

pub mod color;
pub mod error;
pub mod highlight;
pub mod index;
pub mod rules;
pub mod selection;
pub mod store;
pub mod view;

mod search;

// re-export the working set
pub use color::{Rgb, TextColor};
pub use error::{Error, Result};
pub use highlight::{Highlight, SEARCH_HIT_COLOR, highlights_for};
pub use index::VisibleRow;
pub use rules::{Classification, FilterRule, MatchKind, RuleKind, RuleSet};
pub use selection::SelectionInfo;
pub use store::{LogBuffer, MessageStore};
pub use view::{Change, LogView};
