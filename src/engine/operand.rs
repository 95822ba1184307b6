//! Operand parser: reads typed arguments out of a block's label.
//!
//! Every operand the engine understands is listed exactly once in
//! [`MARKERS`]: the opcode it belongs to, its slot, the literal marker that
//! precedes it, and the default used when the marker is missing or the text
//! after it does not parse. Extraction never fails.
//!
//! Markers are located case-insensitively. Text operands run up to an
//! optional terminator marker (e.g. `" for "`), otherwise to the end.

use log::warn;

use super::instruction::Opcode;

/// A numeric operand as written in a label.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    /// A bare word in a numeric slot: read from the variable of that name at
    /// run time. Unknown names read as zero.
    Variable(String),
}

/// Which occurrence of a marker to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expect {
    Number(f64),
    /// Number rounded towards the nearest integer.
    Integer(i64),
    Text {
        until: Option<&'static str>,
        default: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSpec {
    pub opcode: Opcode,
    pub slot: u8,
    pub marker: &'static str,
    pub search: Search,
    pub expect: Expect,
}

const fn num(opcode: Opcode, slot: u8, marker: &'static str, default: f64) -> MarkerSpec {
    MarkerSpec { opcode, slot, marker, search: Search::First, expect: Expect::Number(default) }
}

const fn last_num(opcode: Opcode, slot: u8, marker: &'static str, default: f64) -> MarkerSpec {
    MarkerSpec { opcode, slot, marker, search: Search::Last, expect: Expect::Number(default) }
}

const fn text(
    opcode: Opcode,
    slot: u8,
    marker: &'static str,
    until: Option<&'static str>,
    default: &'static str,
) -> MarkerSpec {
    MarkerSpec { opcode, slot, marker, search: Search::First, expect: Expect::Text { until, default } }
}

/// The marker table. Opcode selection happens per block kind before this
/// table is consulted, so a marker such as `"to "` may appear under several
/// opcodes without ambiguity.
pub static MARKERS: &[MarkerSpec] = &[
    // Motion
    num(Opcode::Move, 0, "move ", 10.0),
    num(Opcode::TurnRight, 0, "right ", 15.0),
    num(Opcode::TurnLeft, 0, "left ", 15.0),
    num(Opcode::PointInDirection, 0, "direction ", 90.0),
    num(Opcode::GoTo, 0, "x:", 0.0),
    num(Opcode::GoTo, 1, "y:", 0.0),
    num(Opcode::ChangeX, 0, "by ", 10.0),
    num(Opcode::ChangeY, 0, "by ", 10.0),
    num(Opcode::SetX, 0, "to ", 0.0),
    num(Opcode::SetY, 0, "to ", 0.0),
    // Looks
    text(Opcode::Say, 0, "say ", None, "Hello!"),
    text(Opcode::Think, 0, "think ", None, "Hmm..."),
    MarkerSpec {
        opcode: Opcode::SayFor,
        slot: 0,
        marker: "say ",
        search: Search::First,
        expect: Expect::Text { until: Some(" for "), default: "Hello!" },
    },
    last_num(Opcode::SayFor, 1, " for ", 2.0),
    MarkerSpec {
        opcode: Opcode::ThinkFor,
        slot: 0,
        marker: "think ",
        search: Search::First,
        expect: Expect::Text { until: Some(" for "), default: "Hmm..." },
    },
    last_num(Opcode::ThinkFor, 1, " for ", 2.0),
    num(Opcode::ChangeSize, 0, "by ", 10.0),
    num(Opcode::SetSize, 0, "to ", 100.0),
    MarkerSpec {
        opcode: Opcode::SwitchCostume,
        slot: 0,
        marker: "to ",
        search: Search::First,
        expect: Expect::Integer(1),
    },
    // Sound
    text(Opcode::PlaySound, 0, "sound ", None, "pop"),
    num(Opcode::SetVolume, 0, "to ", 100.0),
    num(Opcode::ChangeVolume, 0, "by ", -10.0),
    // Control
    num(Opcode::Wait, 0, "wait ", 1.0),
    MarkerSpec {
        opcode: Opcode::Repeat,
        slot: 0,
        marker: "repeat ",
        search: Search::First,
        expect: Expect::Integer(10),
    },
    // Operators
    num(Opcode::PickRandom, 0, "random ", 1.0),
    last_num(Opcode::PickRandom, 1, " to ", 10.0),
    // Variables
    text(Opcode::SetVariable, 0, "set ", Some(" to "), "my variable"),
    last_num(Opcode::SetVariable, 1, " to ", 0.0),
    text(Opcode::ChangeVariable, 0, "change ", Some(" by "), "my variable"),
    last_num(Opcode::ChangeVariable, 1, " by ", 1.0),
    text(Opcode::ShowVariable, 0, "variable ", None, "my variable"),
    text(Opcode::HideVariable, 0, "variable ", None, "my variable"),
];

pub fn spec_for(opcode: Opcode, slot: u8) -> Option<&'static MarkerSpec> {
    MARKERS.iter().find(|m| m.opcode == opcode && m.slot == slot)
}

/// Numeric operand `slot` of `opcode`, read from `label`.
pub fn number(label: &str, opcode: Opcode, slot: u8) -> Operand {
    let Some(spec) = spec_for(opcode, slot) else {
        warn!("no marker registered for {opcode:?} slot {slot}");
        return Operand::Number(0.0);
    };
    let default = match spec.expect {
        Expect::Number(d) => d,
        Expect::Integer(d) => d as f64,
        Expect::Text { .. } => 0.0,
    };
    let token = locate(label, spec.marker, spec.search).and_then(|start| first_token(&label[start..]));
    match token {
        Some(tok) => match parse_number(tok) {
            Some(n) => Operand::Number(if matches!(spec.expect, Expect::Integer(_)) { n.round() } else { n }),
            None if is_identifier(tok) => Operand::Variable(tok.to_string()),
            None => Operand::Number(default),
        },
        None => Operand::Number(default),
    }
}

/// Text operand `slot` of `opcode`, read from `label`.
pub fn text_operand(label: &str, opcode: Opcode, slot: u8) -> String {
    let Some(spec) = spec_for(opcode, slot) else {
        warn!("no marker registered for {opcode:?} slot {slot}");
        return String::new();
    };
    let (until, default) = match spec.expect {
        Expect::Text { until, default } => (until, default),
        _ => (None, ""),
    };
    text_between(label, spec.marker, until, default)
}

/// The text following `marker` up to the last occurrence of `until` (or the
/// end), trimmed and with surrounding double quotes removed.
pub fn text_between(label: &str, marker: &str, until: Option<&str>, default: &str) -> String {
    let Some(start) = locate(label, marker, Search::First) else {
        return default.to_string();
    };
    let rest = &label[start..];
    let end = until
        .and_then(|u| find_ci(rest, u, Search::Last))
        .unwrap_or(rest.len());
    let body = strip_quotes(rest[..end].trim());
    if body.is_empty() {
        default.to_string()
    } else {
        body.to_string()
    }
}

/// True if `marker` occurs in `label` and a number follows its last occurrence.
pub fn has_number_after(label: &str, marker: &str) -> bool {
    locate(label, marker, Search::Last)
        .and_then(|start| first_token(&label[start..]))
        .and_then(parse_number)
        .is_some()
}

/// Byte offset just past `marker` in `label`, case-insensitive.
fn locate(label: &str, marker: &str, search: Search) -> Option<usize> {
    find_ci(label, marker, search).map(|i| i + marker.len())
}

fn find_ci(haystack: &str, needle: &str, search: Search) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets valid for `haystack`.
    let hay = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    match search {
        Search::First => hay.find(&needle),
        Search::Last => hay.rfind(&needle),
    }
}

/// The first whitespace-delimited token, leading whitespace skipped.
fn first_token(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim_end_matches(['%', ',']);
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn strip_quotes(s: &str) -> &str {
    match (s.find('"'), s.rfind('"')) {
        (Some(open), Some(close)) if close > open => &s[open + 1..close],
        _ => s,
    }
}

// ---------------------------------------------------------------------------
// Editable numeric sub-fields
// ---------------------------------------------------------------------------

/// Every whitespace token of `label` that parses as a number.
pub fn numeric_tokens(label: &str) -> Vec<f64> {
    label.split_whitespace().filter_map(parse_number).collect()
}

/// Replace the `index`-th numeric token of `label` with `value`, keeping any
/// trailing `%`. Tokens are re-joined with single spaces.
pub fn replace_numeric_token(label: &str, index: usize, value: f64) -> Option<String> {
    let mut seen = 0;
    let mut replaced = false;
    let tokens: Vec<String> = label
        .split_whitespace()
        .map(|tok| {
            if parse_number(tok).is_some() {
                let hit = seen == index;
                seen += 1;
                if hit {
                    replaced = true;
                    let suffix = if tok.ends_with('%') { "%" } else { "" };
                    return format!("{}{suffix}", format_number(value));
                }
            }
            tok.to_string()
        })
        .collect();
    replaced.then(|| tokens.join(" "))
}

/// Render a number the way labels show it: integers without a fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_marker_is_registered_once() {
        for (i, a) in MARKERS.iter().enumerate() {
            for b in &MARKERS[i + 1..] {
                assert!(
                    !(a.opcode == b.opcode && a.slot == b.slot),
                    "{:?} slot {} registered twice",
                    a.opcode,
                    a.slot
                );
            }
        }
    }

    #[test]
    fn reads_number_after_marker() {
        assert_eq!(number("move 25 steps", Opcode::Move, 0), Operand::Number(25.0));
        assert_eq!(number("Move 7 Steps", Opcode::Move, 0), Operand::Number(7.0));
        assert_eq!(number("go to x: -40 y: 15", Opcode::GoTo, 1), Operand::Number(15.0));
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(number("move steps", Opcode::Move, 0), Operand::Variable("steps".into()));
        assert_eq!(number("move", Opcode::Move, 0), Operand::Number(10.0));
        assert_eq!(number("wait ?? secs", Opcode::Wait, 0), Operand::Number(1.0));
        assert_eq!(number("wait inf secs", Opcode::Wait, 0), Operand::Variable("inf".into()));
    }

    #[test]
    fn integer_slots_round() {
        assert_eq!(number("repeat 2.6", Opcode::Repeat, 0), Operand::Number(3.0));
        assert_eq!(number("repeat", Opcode::Repeat, 0), Operand::Number(10.0));
    }

    #[test]
    fn text_runs_to_terminator() {
        assert_eq!(text_operand("say \"Hi there\" for 2 secs", Opcode::SayFor, 0), "Hi there");
        assert_eq!(number("say Hi for now for 3 secs", Opcode::SayFor, 1), Operand::Number(3.0));
        assert_eq!(text_operand("say Hi for now for 3 secs", Opcode::SayFor, 0), "Hi for now");
        assert_eq!(text_operand("Say Hello!", Opcode::Say, 0), "Hello!");
        assert_eq!(text_operand("say", Opcode::Say, 0), "Hello!");
    }

    #[test]
    fn variable_name_stops_at_to() {
        assert_eq!(text_operand("set score to 5", Opcode::SetVariable, 0), "score");
        assert_eq!(number("set score to 5", Opcode::SetVariable, 1), Operand::Number(5.0));
        assert_eq!(text_operand("change my var by -2", Opcode::ChangeVariable, 0), "my var");
    }

    #[test]
    fn percent_suffix_is_ignored() {
        assert_eq!(number("set size to 150 %", Opcode::SetSize, 0), Operand::Number(150.0));
        assert_eq!(number("set volume to 40%", Opcode::SetVolume, 0), Operand::Number(40.0));
    }

    #[test]
    fn replaces_numeric_tokens() {
        assert_eq!(replace_numeric_token("set size to 100 %", 0, 50.0).as_deref(), Some("set size to 50 %"));
        assert_eq!(replace_numeric_token("set size to 100%", 0, 2.5).as_deref(), Some("set size to 2.5%"));
        assert_eq!(replace_numeric_token("show", 0, 1.0), None);
    }
}
