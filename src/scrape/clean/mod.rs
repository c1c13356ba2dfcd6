use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

const NO_BREAK_SPACE: char = '\u{a0}';
const ZERO_WIDTH_SPACE: char = '\u{200b}';

/// Footnote markers such as `[1]` or `[nota 2]`, and bare digit runs.
static FOOTNOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\d+").expect("Invalid footnote regex"));

/// Canonical country name from a table cell.
///
/// Everything after the first no-break space is dropped (flag captions and
/// notes live there), then footnotes, digits and zero-width spaces go, and
/// words the markup repeated are collapsed keeping their first occurrence.
pub fn clean_country_name(text: &str) -> String {
    let head = text.split(NO_BREAK_SPACE).next().unwrap_or_default();
    let stripped = FOOTNOTES.replace_all(head, "");
    let stripped = stripped.trim().replace(ZERO_WIDTH_SPACE, "");

    stripped.split_whitespace().unique().join(" ")
}

/// Population cell as an integer; thousands separators may be `.`, `,` or a
/// no-break space. Anything else that fails to parse yields `None`.
pub fn parse_population_text(text: &str) -> Option<u64> {
    text.trim()
        .chars()
        .filter(|c| !matches!(*c, '.' | ',' | NO_BREAK_SPACE))
        .collect::<String>()
        .parse()
        .ok()
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}
