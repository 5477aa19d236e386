use crate::color::{Rgb, TextColor};

/// color painted under search hits, distinct from any line base color
pub const SEARCH_HIT_COLOR: TextColor =
    TextColor::new(Rgb::new(255, 255, 128), Rgb::new(0, 0, 0));

/// a colored sub-range within a line's displayed text
///
/// `begin..end` is a half-open byte range into the line. Matching is ASCII
/// case-insensitive, so offsets found in the lowercased haystack are valid
/// character boundaries in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub begin: usize,
    pub end: usize,
    pub color: TextColor,
}

impl Highlight {
    pub fn new(begin: usize, end: usize, color: TextColor) -> Self {
        Self { begin, end, color }
    }
}

/// all non-overlapping occurrences of `term` in `text`, left to right
///
/// Empty for an empty term. The scan resumes immediately after each match
/// end, so overlapping repeats of a pattern only surface the leftmost.
/// Pure and deterministic; results are cacheable per row keyed by the
/// search term (see the generation counter in [`crate::LogView`]).
pub fn highlights_for(text: &str, term: &str) -> Vec<Highlight> {
    if term.is_empty() {
        return Vec::new();
    }

    let haystack = text.to_ascii_lowercase();
    let needle = term.to_ascii_lowercase();

    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let begin = from + pos;
        let end = begin + needle.len();
        spans.push(Highlight::new(begin, end, SEARCH_HIT_COLOR));
        from = end;
    }
    spans
}

/// true when `term` occurs in `text` (same matching rules as the spans)
pub fn contains_term(text: &str, term: &str) -> bool {
    !term.is_empty()
        && text
            .to_ascii_lowercase()
            .contains(&term.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_term_yields_nothing() {
        assert!(highlights_for("ERROR failed", "").is_empty());
    }

    #[test]
    fn test_no_occurrence_yields_nothing() {
        assert!(highlights_for("ERROR failed", "retry").is_empty());
    }

    #[test]
    fn test_single_case_insensitive_match() {
        let spans = highlights_for("ERROR retrying", "retry");
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].begin, spans[0].end), (6, 11));
    }

    #[test]
    fn test_multiple_occurrences_in_order() {
        let spans = highlights_for("abc ABC abc", "abc");
        let ranges: Vec<_> = spans.iter().map(|h| (h.begin, h.end)).collect();
        assert_eq!(ranges, vec![(0, 3), (4, 7), (8, 11)]);
    }

    #[test]
    fn test_overlapping_repeats_surface_leftmost_only() {
        // "aaaa" contains "aa" at 0, 1, 2; non-overlapping scan keeps 0 and 2
        let spans = highlights_for("aaaa", "aa");
        let ranges: Vec<_> = spans.iter().map(|h| (h.begin, h.end)).collect();
        assert_eq!(ranges, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_ranges_are_sorted_and_disjoint() {
        let spans = highlights_for("x retry retry retryretry x", "retry");
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].begin);
        }
        for h in &spans {
            assert!(h.begin < h.end);
        }
    }

    #[test]
    fn test_every_range_is_a_real_match() {
        let text = "Mixed CASE mixed case MIXED";
        let spans = highlights_for(text, "mixed");
        assert_eq!(spans.len(), 3);
        for h in &spans {
            assert!(text[h.begin..h.end].eq_ignore_ascii_case("mixed"));
        }
    }

    #[test]
    fn test_offsets_stay_valid_around_multibyte_text() {
        let text = "naïve retry naïve";
        let spans = highlights_for(text, "RETRY");
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].begin..spans[0].end], "retry");
    }

    #[test]
    fn test_contains_term_matches_span_semantics() {
        assert!(contains_term("ERROR retrying", "Retry"));
        assert!(!contains_term("ERROR retrying", "debug"));
        assert!(!contains_term("ERROR retrying", ""));
    }
}
