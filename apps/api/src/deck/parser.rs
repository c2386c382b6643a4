//! Deck-list parsing.
//!
//! Accepts the formats the common deck builders export:
//! `4 Lightning Bolt`, `4x Lightning Bolt`, `1 Sol Ring (C21) 263`,
//! `1 Delver of Secrets // Insectile Aberration`, with optional trailing
//! `[Category]` tags and `//` or `#` comment lines.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::deck::{CardCopy, DeckEntry};

static TRAILING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[[^\]]*\]\s*$").expect("valid tag regex"));
static QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[xX]?\s+(.+)").expect("valid quantity regex"));
static SET_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+\(([a-zA-Z0-9]+)\)\s+([a-zA-Z0-9-]+)\s*$").expect("valid set regex")
});
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("valid regex"));
static UNSAFE_PATH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Parses a pasted deck list into entries, in input order.
///
/// Lines that are blank, comments, or reduce to nothing after tag stripping
/// are skipped. A leading quantity of zero also skips the line.
pub fn parse_deck_list(text: &str) -> Vec<DeckEntry> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<DeckEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
        return None;
    }

    let line = TRAILING_TAG.replace(line, "");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (qty, rest) = match QUANTITY.captures(line) {
        // Quantities too large for u32 are treated as part of the name; the
        // copy limit would reject them anyway.
        Some(caps) => match caps[1].parse::<u32>() {
            Ok(qty) => (qty, caps.get(2).map_or("", |m| m.as_str()).trim()),
            Err(_) => (1, line),
        },
        None => (1, line),
    };
    if qty == 0 {
        return None;
    }

    let (name, set_code, set_num) = match SET_SUFFIX.captures(rest) {
        Some(caps) => (
            caps[1].trim().to_string(),
            Some(caps[2].to_lowercase()),
            Some(caps[3].to_string()),
        ),
        None => (rest.to_string(), None, None),
    };

    let name = match name.split_once(" // ") {
        Some((front, _)) => front.trim().to_string(),
        None => name,
    };

    Some(DeckEntry {
        qty,
        name,
        set_code,
        set_num,
    })
}

/// Expands each entry into one `CardCopy` per unit of quantity.
pub fn expand(entries: &[DeckEntry]) -> Vec<CardCopy> {
    entries
        .iter()
        .flat_map(|entry| {
            (1..=entry.qty).map(move |n| CardCopy {
                name: entry.name.clone(),
                set_code: entry.set_code.clone(),
                set_num: entry.set_num.clone(),
                suffix: if entry.qty > 1 {
                    format!(" ({n})")
                } else {
                    String::new()
                },
            })
        })
        .collect()
}

/// Total number of copies the entries expand to.
pub fn total_copies(entries: &[DeckEntry]) -> usize {
    entries.iter().map(|e| e.qty as usize).sum()
}

/// Lowercases and drops everything except ASCII letters and digits.
pub fn normalise(name: &str) -> String {
    NON_ALNUM.replace_all(&name.to_lowercase(), "").into_owned()
}

/// Replaces characters that are not allowed in archive paths on common filesystems.
pub fn safe_filename(name: &str) -> String {
    UNSAFE_PATH_CHARS.replace_all(name, "_").into_owned()
}
