//! Terminal display width.
//!
//! All width decisions for the screen grid go through these helpers so the
//! renderer and the layout agree on column math. Control characters report 0
//! here; callers that print them substitute a caret form first.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const VS16: char = '\u{FE0F}';

/// Cells occupied by one char: 0 (combining / control), 1, or 2.
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Cells occupied by a grapheme cluster. Emoji presentation sequences
/// (`VS16`) are widened to 2 since terminals render them that way.
pub fn egc_width(cluster: &str) -> usize {
    let base = cluster.width();
    if base == 1 && cluster.contains(VS16) {
        return 2;
    }
    base
}

/// Cells occupied by a string, summed per grapheme cluster.
pub fn str_width(s: &str) -> usize {
    s.graphemes(true).map(egc_width).sum()
}
