//! Deterministic highlights without a model.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Longest highlight kept verbatim, in characters.
pub const MAX_HIGHLIGHT_CHARS: usize = 240;

static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[•\-\*–—·∙▪◦]+\s*|\(?\d{1,3}(?:\.\d{1,3})*(?:\)\s*|[.:](?:\s+|$))|\(?[A-Za-z][\).]\s+|[IVXivx]{1,5}\.\s+)").unwrap()
});

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^page\s+\d+(?:\s+of\s+\d+)?$").unwrap());

static AGENDA_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:items?|resolutions?|ordinances?|motions?|approve|approval|reports?|public hearing|consent|budget|contracts?|appointments?|presentations?|reading)\b",
    )
    .unwrap()
});

/// Collapse whitespace and strip bullet glyphs or numbering.
///
/// Numbering must be followed by `)` or by `.`/`:` and a space, so a leading
/// clock time such as `6:30 p.m.` stays intact.
pub(crate) fn clean_line(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    BULLET_PREFIX.replace(&collapsed, "").trim().to_string()
}

fn cut(unit: &str) -> String {
    if unit.chars().count() <= MAX_HIGHLIGHT_CHARS {
        return unit.to_string();
    }
    let mut short: String = unit.chars().take(MAX_HIGHLIGHT_CHARS - 3).collect();
    short.push_str("...");
    short
}

/// Up to `max_items` literal lines from the agenda.
///
/// Lines naming agenda business (ordinances, hearings, approvals, ...) are
/// preferred when there are any. Same input, same output.
pub fn extractive_highlights(text: &str, max_items: usize) -> Vec<String> {
    let units: Vec<String> = text
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty() && !PAGE_MARKER.is_match(line))
        .collect();

    let preferred: Vec<&String> = units.iter().filter(|u| AGENDA_KEYWORDS.is_match(u)).collect();
    let chosen = if preferred.is_empty() {
        units.iter().collect()
    } else {
        preferred
    };

    let mut seen = HashSet::new();
    chosen
        .into_iter()
        .filter(|unit| seen.insert(unit.to_lowercase()))
        .map(|unit| cut(unit))
        .take(max_items)
        .collect()
}
