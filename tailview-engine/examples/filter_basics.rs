//! Filter basics: classify a few lines, search, and export.
//!
//! This demonstrates driving the engine without any UI:
//! - Build a rule set (exclude DEBUG, color ERROR lines)
//! - Feed lines through append
//! - Search and read back highlight ranges
//!
//! Run with: cargo run --example filter_basics

use tailview_engine::{
    FilterRule, LogBuffer, LogView, MatchKind, MessageStore, Rgb, RuleKind, RuleSet, TextColor,
};

fn main() {
    let red = TextColor::new(Rgb::new(64, 0, 0), Rgb::new(255, 128, 128));
    let rules = RuleSet::new(vec![
        FilterRule::new(RuleKind::Exclude, "DEBUG", MatchKind::Substring),
        FilterRule::new(RuleKind::Highlight, "ERROR", MatchKind::Substring).with_color(red),
    ]);

    let mut store = LogBuffer::new();
    let mut view = LogView::new(rules);

    for text in [
        "INFO starting up",
        "DEBUG loading config",
        "ERROR connection refused",
        "INFO retrying in 5s",
        "ERROR connection refused again",
    ] {
        let line = store.append(text);
        view.append(line, text);
    }

    println!("{} of {} lines visible", view.row_count(), store.line_count());

    view.set_search_term("connection");
    for i in 0..view.row_count() {
        let text = view.row_text(i, &store).unwrap();
        let spans = view.highlights_at(i, &store).unwrap();
        let ranges: Vec<_> = spans.iter().map(|h| (h.begin, h.end)).collect();
        println!("row {i}: {text:?} highlights {ranges:?}");
    }

    if view.find_next("again", &store) {
        println!("found at visible row {:?}", view.search_position());
    }

    let mut exported = Vec::new();
    view.export_visible(&store, &mut exported).unwrap();
    print!("--- export ---\n{}", String::from_utf8_lossy(&exported));
}
