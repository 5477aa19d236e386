use crate::color::TextColor;
use regex::Regex;

/// what a matching rule does to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// line is visible when this matches first
    Include,
    /// line is hidden when this matches first
    Exclude,
    /// collaborator-side: jump to / follow matching lines
    Track,
    /// collaborator-side: pause auto-scroll on a match
    Stop,
    /// coloring only, no effect on visibility
    Highlight,
}

/// how a rule's pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// case-insensitive substring
    Substring,
    /// regex crate syntax
    Regex,
}

/// compiled form of a rule pattern
///
/// A regex that fails to compile becomes `Broken`, which never matches;
/// one bad rule must not block rendering of the rest of the log.
#[derive(Debug, Clone)]
enum Matcher {
    Substring { needle_lower: String },
    Regex(Box<Regex>),
    Broken,
}

impl Matcher {
    fn compile(pattern: &str, kind: MatchKind) -> Self {
        match kind {
            MatchKind::Substring => Matcher::Substring {
                needle_lower: pattern.to_lowercase(),
            },
            MatchKind::Regex => match Regex::new(pattern) {
                Ok(re) => Matcher::Regex(Box::new(re)),
                Err(e) => {
                    log::warn!("filter pattern {:?} does not compile: {}", pattern, e);
                    Matcher::Broken
                }
            },
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Substring { needle_lower } => {
                !needle_lower.is_empty() && text.to_lowercase().contains(needle_lower)
            }
            Matcher::Regex(re) => re.is_match(text),
            Matcher::Broken => false,
        }
    }
}

/// one filter directive; evaluated in declared order
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub kind: RuleKind,
    pub pattern: String,
    pub match_kind: MatchKind,
    pub enabled: bool,
    pub color: Option<TextColor>,
    matcher: Matcher,
}

impl FilterRule {
    pub fn new(kind: RuleKind, pattern: impl Into<String>, match_kind: MatchKind) -> Self {
        let pattern = pattern.into();
        let matcher = Matcher::compile(&pattern, match_kind);
        Self {
            kind,
            pattern,
            match_kind,
            enabled: true,
            color: None,
            matcher,
        }
    }

    pub fn with_color(mut self, color: TextColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// visibility verdict and base color for one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub visible: bool,
    /// `None` inherits the presentation default
    pub color: Option<TextColor>,
}

impl Classification {
    const HIDDEN: Self = Self {
        visible: false,
        color: None,
    };
}

/// an ordered, immutable rule set
///
/// The [`LogView`](crate::LogView) holds the active set behind an `Arc` and
/// swaps the whole snapshot on edit, so a rebuild in progress always runs
/// against one consistent version.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FilterRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// decide visibility and base color for one line of text
    ///
    /// Rule order is authoritative: the first enabled Include or Exclude
    /// rule that matches decides. When none matched, the line is visible
    /// unless the set contains an enabled Include rule (an Include-bearing
    /// set shows only what some Include matched). Color is not computed for
    /// hidden lines.
    pub fn classify(&self, text: &str) -> Classification {
        for rule in self.enabled() {
            if matches!(rule.kind, RuleKind::Include | RuleKind::Exclude) && rule.is_match(text) {
                if rule.kind == RuleKind::Exclude {
                    return Classification::HIDDEN;
                }
                return Classification {
                    visible: true,
                    color: self.first_color(text),
                };
            }
        }

        // no Include/Exclude rule matched
        let include_present = self.enabled().any(|r| r.kind == RuleKind::Include);
        if include_present {
            return Classification::HIDDEN;
        }

        Classification {
            visible: true,
            color: self.first_color(text),
        }
    }

    /// true when an enabled Track rule matches
    pub fn is_track_match(&self, text: &str) -> bool {
        self.enabled()
            .any(|r| r.kind == RuleKind::Track && r.is_match(text))
    }

    /// true when an enabled Stop rule matches
    pub fn is_stop_match(&self, text: &str) -> bool {
        self.enabled()
            .any(|r| r.kind == RuleKind::Stop && r.is_match(text))
    }

    fn enabled(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    // first enabled rule of any kind that carries a color and matches
    fn first_color(&self, text: &str) -> Option<TextColor> {
        self.enabled()
            .find(|r| r.color.is_some() && r.is_match(text))
            .and_then(|r| r.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn color(tag: u8) -> TextColor {
        TextColor::new(Rgb::new(tag, 0, 0), Rgb::new(0, tag, 0))
    }

    fn include(pattern: &str) -> FilterRule {
        FilterRule::new(RuleKind::Include, pattern, MatchKind::Substring)
    }

    fn exclude(pattern: &str) -> FilterRule {
        FilterRule::new(RuleKind::Exclude, pattern, MatchKind::Substring)
    }

    #[test]
    fn test_empty_set_shows_everything() {
        let rules = RuleSet::default();
        assert!(rules.classify("anything at all").visible);
    }

    #[test]
    fn test_exclude_hides_matching_line() {
        let rules = RuleSet::new(vec![exclude("DEBUG")]);
        assert!(!rules.classify("DEBUG trace").visible);
        assert!(rules.classify("INFO start").visible);
    }

    #[test]
    fn test_include_present_requires_a_match() {
        let rules = RuleSet::new(vec![include("ERROR")]);
        assert!(rules.classify("ERROR failed").visible);
        assert!(!rules.classify("INFO start").visible);
    }

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let rules = RuleSet::new(vec![include("error")]);
        assert!(rules.classify("ERROR failed").visible);
    }

    // rule order is authoritative; these two pin the precedence both ways
    #[test]
    fn test_exclude_before_include_wins_on_double_match() {
        let rules = RuleSet::new(vec![exclude("ERROR"), include("ERROR")]);
        assert!(!rules.classify("ERROR failed").visible);
    }

    #[test]
    fn test_include_before_exclude_wins_on_double_match() {
        let rules = RuleSet::new(vec![include("ERROR"), exclude("ERROR")]);
        assert!(rules.classify("ERROR failed").visible);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let rules = RuleSet::new(vec![exclude("ERROR").disabled()]);
        assert!(rules.classify("ERROR failed").visible);
    }

    #[test]
    fn test_regex_rule_matches() {
        let rules = RuleSet::new(vec![FilterRule::new(
            RuleKind::Include,
            r"code:\s*5\d{2}",
            MatchKind::Regex,
        )]);
        assert!(rules.classify("Error code: 503").visible);
        assert!(!rules.classify("Error code: 404").visible);
    }

    #[test]
    fn test_malformed_regex_never_matches() {
        let broken = FilterRule::new(RuleKind::Exclude, "[invalid", MatchKind::Regex);
        let rules = RuleSet::new(vec![broken]);
        assert!(rules.classify("[invalid bracket soup").visible);
    }

    #[test]
    fn test_first_matching_colored_rule_supplies_color() {
        let rules = RuleSet::new(vec![
            FilterRule::new(RuleKind::Highlight, "warn", MatchKind::Substring)
                .with_color(color(1)),
            FilterRule::new(RuleKind::Highlight, "warning", MatchKind::Substring)
                .with_color(color(2)),
        ]);
        let c = rules.classify("a warning appeared");
        assert_eq!(c.color, Some(color(1)));
    }

    #[test]
    fn test_no_color_computed_for_hidden_line() {
        let rules = RuleSet::new(vec![
            exclude("DEBUG"),
            FilterRule::new(RuleKind::Highlight, "DEBUG", MatchKind::Substring)
                .with_color(color(1)),
        ]);
        let c = rules.classify("DEBUG trace");
        assert!(!c.visible);
        assert_eq!(c.color, None);
    }

    #[test]
    fn test_track_and_stop_predicates() {
        let rules = RuleSet::new(vec![
            FilterRule::new(RuleKind::Track, "session", MatchKind::Substring),
            FilterRule::new(RuleKind::Stop, "FATAL", MatchKind::Substring),
        ]);
        assert!(rules.is_track_match("session opened"));
        assert!(!rules.is_track_match("FATAL crash"));
        assert!(rules.is_stop_match("FATAL crash"));
        assert!(!rules.is_stop_match("session opened"));
    }

    #[test]
    fn test_track_rules_do_not_affect_visibility() {
        let rules = RuleSet::new(vec![
            FilterRule::new(RuleKind::Track, "session", MatchKind::Substring),
            include("ERROR"),
        ]);
        // track matches but no include matches: hidden
        assert!(!rules.classify("session opened").visible);
        assert!(rules.classify("ERROR in session").visible);
    }
}
