//! Rule-set files: JSON on disk, engine rules in memory.
//!
//! The file is an array of rule objects:
//!
//! ```json
//! [
//!   { "kind": "exclude", "pattern": "DEBUG" },
//!   { "kind": "include", "pattern": "ERROR|WARN", "regex": true },
//!   { "kind": "highlight", "pattern": "timeout",
//!     "back": "#402000", "fore": "#ffc080" },
//!   { "kind": "stop", "pattern": "PANIC", "enabled": false }
//! ]
//! ```
//!
//! `regex` and `enabled` default to `false`/`true`; colors are optional and
//! only meaningful together.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{fs, path::Path};
use tailview_engine::{FilterRule, MatchKind, Rgb, RuleKind, RuleSet, TextColor};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    kind: String,
    pattern: String,
    #[serde(default)]
    regex: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
    back: Option<String>,
    fore: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// load a rule set from a JSON file
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading rule file {}", path.display()))?;
    let specs: Vec<RuleSpec> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing rule file {}", path.display()))?;

    let mut rules = Vec::with_capacity(specs.len());
    for spec in specs {
        rules.push(rule_from_spec(spec)?);
    }
    Ok(RuleSet::new(rules))
}

fn rule_from_spec(spec: RuleSpec) -> Result<FilterRule> {
    let kind = match spec.kind.to_lowercase().as_str() {
        "include" => RuleKind::Include,
        "exclude" => RuleKind::Exclude,
        "track" => RuleKind::Track,
        "stop" => RuleKind::Stop,
        "highlight" => RuleKind::Highlight,
        other => bail!("unknown rule kind {:?}", other),
    };

    let match_kind = if spec.regex {
        MatchKind::Regex
    } else {
        MatchKind::Substring
    };

    let mut rule = FilterRule::new(kind, spec.pattern, match_kind);
    if !spec.enabled {
        rule = rule.disabled();
    }

    match (&spec.back, &spec.fore) {
        (Some(back), Some(fore)) => {
            rule = rule.with_color(TextColor::new(parse_hex(back)?, parse_hex(fore)?));
        }
        (None, None) => {}
        _ => bail!(
            "rule {:?}: back and fore colors must be given together",
            rule.pattern
        ),
    }

    Ok(rule)
}

// "#RRGGBB" → Rgb
fn parse_hex(s: &str) -> Result<Rgb> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("bad color {:?}, expected #RRGGBB", s);
    }
    let byte = |range| u8::from_str_radix(&hex[range], 16).with_context(|| format!("bad color {:?}", s));
    Ok(Rgb::new(byte(0..2)?, byte(2..4)?, byte(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_str(json: &str) -> Result<RuleSet> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        load_rules(file.path())
    }

    #[test]
    fn test_load_minimal_rules() {
        let rules = load_str(
            r#"[
                { "kind": "exclude", "pattern": "DEBUG" },
                { "kind": "include", "pattern": "ERROR" }
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.rules().len(), 2);
        assert_eq!(rules.rules()[0].kind, RuleKind::Exclude);
        assert!(rules.rules()[1].enabled);
    }

    #[test]
    fn test_load_colors_and_flags() {
        let rules = load_str(
            r##"[
                { "kind": "highlight", "pattern": "timeout",
                  "back": "#402000", "fore": "#FFC080", "enabled": false }
            ]"##,
        )
        .unwrap();
        let rule = &rules.rules()[0];
        assert!(!rule.enabled);
        assert_eq!(
            rule.color,
            Some(TextColor::new(Rgb::new(0x40, 0x20, 0x00), Rgb::new(0xff, 0xc0, 0x80)))
        );
    }

    #[test]
    fn test_regex_flag_selects_match_kind() {
        let rules = load_str(r#"[ { "kind": "include", "pattern": "a|b", "regex": true } ]"#)
            .unwrap();
        assert_eq!(rules.rules()[0].match_kind, MatchKind::Regex);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(load_str(r#"[ { "kind": "banana", "pattern": "x" } ]"#).is_err());
    }

    #[test]
    fn test_lone_color_is_rejected() {
        assert!(load_str(r##"[ { "kind": "highlight", "pattern": "x", "back": "#000000" } ]"##).is_err());
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        assert!(load_str(r##"[ { "kind": "highlight", "pattern": "x", "back": "#zzzzzz", "fore": "#000000" } ]"##).is_err());
    }
}
