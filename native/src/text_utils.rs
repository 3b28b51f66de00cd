use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

// CSI sequences first: alternation is leftmost-first and the two-byte form
// would otherwise swallow the `[` of a CSI introducer.
const ANSI_PATTERN: &str = r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]";

fn ansi_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANSI_PATTERN).ok()).as_ref()
}

/// Remove embedded ANSI escape sequences (CSI, OSC and two-byte escapes).
/// Borrows when the input has no escape byte at all.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    match ansi_regex() {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}

/// Visible width in terminal columns, ignoring escape sequences. Measured
/// char by char, the same way the painter advances the cursor.
pub fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().map(char_width).sum()
}

/// Column width of a single char; control and combining chars are 0.
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Split content into logical lines. Empty content is one empty line.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        vec![""]
    } else {
        content.split('\n').collect()
    }
}

/// Widest visible line, in columns.
pub(crate) fn max_line_width(content: &str) -> usize {
    split_lines(content)
        .into_iter()
        .map(display_width)
        .max()
        .unwrap_or(0)
}

/// Count user-visible grapheme clusters.
pub(crate) fn grapheme_count(content: &str) -> usize {
    UnicodeSegmentation::graphemes(content, true).count()
}

/// Convert a grapheme index to a byte index in a UTF-8 string.
pub(crate) fn grapheme_to_byte_idx(content: &str, grapheme_idx: usize) -> usize {
    if grapheme_idx == 0 {
        return 0;
    }
    match UnicodeSegmentation::grapheme_indices(content, true).nth(grapheme_idx) {
        Some((idx, _)) => idx,
        None => content.len(),
    }
}
