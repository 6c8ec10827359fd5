//! The in-memory frame: a sparse grid of styled cells.
//!
//! Rows are stored as sparse column maps; missing cells are blank. A wide
//! cluster occupies a leader cell (width 2) and a continuation cell
//! (width 0) right after it. Continuations never print; the diff uses them
//! to widen a repaint back to the leader.

use ahash::AHashMap;
use core_text::egc_width;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::style::{Style, StyledText};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Char {
    /// Printed text: a grapheme cluster, or caret notation for controls.
    pub text: String,
    pub style: Style,
    /// Columns taken; 0 marks the second half of a wide cluster.
    pub width: u8,
}

impl Char {
    pub fn new(cluster: &str, style: Style) -> Self {
        let text = display_text(cluster);
        let width = egc_width(&text).min(2) as u8;
        Self { text, style, width }
    }

    pub fn blank(style: Style) -> Self {
        Self {
            text: " ".to_string(),
            style,
            width: 1,
        }
    }

    pub fn continuation(style: Style) -> Self {
        Self {
            text: String::new(),
            style,
            width: 0,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }
}

/// Control characters print in caret form (`^A`, `^?`).
fn display_text(cluster: &str) -> String {
    let mut chars = cluster.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) < 0x20 => format!("^{}", (c as u8 + b'@') as char),
        (Some('\x7f'), None) => "^?".to_string(),
        _ => cluster.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    rows: Vec<AHashMap<usize, Char>>,
    /// Widest column extent written so far.
    width: usize,
    pub cursor: Point,
    pub show_cursor: bool,
    /// Where a completion menu should anchor (the start of the completed word).
    pub menu_position: Option<Point>,
    line_map: Vec<Option<usize>>,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            show_cursor: true,
            ..Self::default()
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Make sure rows `0..height` exist, even if blank.
    pub fn ensure_height(&mut self, height: usize) {
        if self.rows.len() < height {
            self.rows.resize_with(height, AHashMap::new);
            self.line_map.resize(height, None);
        }
    }

    pub fn get(&self, p: Point) -> Option<&Char> {
        self.rows.get(p.y).and_then(|row| row.get(&p.x))
    }

    /// Cells of row `y`, sparse.
    pub fn row(&self, y: usize) -> Option<&AHashMap<usize, Char>> {
        self.rows.get(y)
    }

    /// One past the last occupied column of row `y`.
    pub fn row_extent(&self, y: usize) -> usize {
        self.rows
            .get(y)
            .and_then(|row| row.iter().map(|(x, c)| x + usize::from(c.width.max(1))).max())
            .unwrap_or(0)
    }

    /// Store a cell, keeping wide clusters consistent: a wide leader gets
    /// its continuation, and overwriting half of a wide cluster blanks the
    /// other half.
    pub fn put(&mut self, p: Point, ch: Char) {
        self.ensure_height(p.y + 1);
        let row = &mut self.rows[p.y];
        if let Some(old) = row.get(&p.x) {
            if old.is_continuation() && p.x > 0 {
                let style = old.style;
                row.insert(p.x - 1, Char::blank(style));
            } else if old.width == 2 && ch.width != 2 {
                row.remove(&(p.x + 1));
            }
        }
        let wide = ch.width == 2;
        let style = ch.style;
        row.insert(p.x, ch);
        if wide {
            let orphan = row
                .get(&(p.x + 2))
                .filter(|next| next.is_continuation())
                .map(|next| next.style);
            if let Some(orphan) = orphan {
                row.insert(p.x + 2, Char::blank(orphan));
            }
            row.insert(p.x + 1, Char::continuation(style));
        }
        let extent = p.x + if wide { 2 } else { 1 };
        self.width = self.width.max(extent);
    }

    /// Write `text` on one row starting at `at`, clipped to `max_x`. Returns
    /// the point after the last cell written.
    pub fn write_str(&mut self, at: Point, style: Style, text: &str, max_x: usize) -> Point {
        let mut x = at.x;
        for cluster in text.graphemes(true) {
            if cluster == "\n" {
                break;
            }
            let ch = Char::new(cluster, style);
            let w = usize::from(ch.width);
            if w == 0 {
                continue;
            }
            if x + w > max_x {
                break;
            }
            self.put(Point::new(x, at.y), ch);
            x += w;
        }
        self.ensure_height(at.y + 1);
        Point::new(x, at.y)
    }

    /// Lay out styled runs from `origin`, wrapping at `wrap_width`.
    ///
    /// The result maps every source char index (counted across all runs) to
    /// its cell, plus one trailing entry for the position after the text.
    /// Line breaks and wraps restart at column 0. A wide cluster that does
    /// not fit moves whole to the next row. Rows are tagged with the source
    /// line they show, so scrolling can reason in input lines.
    pub fn write_data(&mut self, origin: Point, runs: &[StyledText], wrap_width: usize) -> Vec<Point> {
        let wrap_width = wrap_width.max(2);
        let mut positions = Vec::new();
        let mut pos = origin;
        let mut source_line = 0;
        self.tag_row(pos.y, source_line);
        for run in runs {
            for cluster in run.text.graphemes(true) {
                let chars = cluster.chars().count();
                if cluster == "\n" || cluster == "\r\n" {
                    positions.extend(std::iter::repeat_n(pos, chars));
                    pos = Point::new(0, pos.y + 1);
                    source_line += 1;
                    self.tag_row(pos.y, source_line);
                    continue;
                }
                let ch = Char::new(cluster, run.style);
                let w = usize::from(ch.width);
                if pos.x + w > wrap_width && pos.x > 0 {
                    pos = Point::new(0, pos.y + 1);
                    self.tag_row(pos.y, source_line);
                }
                positions.extend(std::iter::repeat_n(pos, chars));
                if w > 0 {
                    self.put(pos, ch);
                    pos.x += w;
                }
            }
        }
        positions.push(pos);
        self.ensure_height(pos.y + 1);
        trace!(target: "render.screen", rows = pos.y + 1 - origin.y, chars = positions.len() - 1, "write_data");
        positions
    }

    fn tag_row(&mut self, y: usize, line: usize) {
        self.ensure_height(y + 1);
        if self.line_map[y].is_none() {
            self.line_map[y] = Some(line);
        }
    }

    /// Source line shown on screen row `y`.
    pub fn source_line(&self, y: usize) -> Option<usize> {
        self.line_map.get(y).copied().flatten()
    }

    /// Screen rows showing source line `line`, first to last.
    pub fn rows_for_line(&self, line: usize) -> std::ops::Range<usize> {
        let first = self.line_map.iter().position(|l| *l == Some(line));
        match first {
            Some(start) => {
                let len = self.line_map[start..]
                    .iter()
                    .take_while(|l| **l == Some(line))
                    .count();
                start..start + len
            }
            None => 0..0,
        }
    }

    /// Paint every cell of `area` with `style`, keeping existing text.
    pub fn fill_area(&mut self, area: Rect, style: Style) {
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                let p = Point::new(x, y);
                match self.get(p) {
                    Some(c) => {
                        let mut c = c.clone();
                        c.style = c.style.merge(style);
                        self.rows[y].insert(x, c);
                    }
                    None => self.put(p, Char::blank(style)),
                }
            }
        }
    }

    /// Copy the part of `src` starting at (`left`, `top`) into `dest`.
    /// Wide clusters cut by the right edge are dropped.
    pub fn blit(&mut self, src: &Screen, top: usize, left: usize, dest: Rect) {
        self.ensure_height(dest.y + dest.height);
        for dy in 0..dest.height {
            let Some(row) = src.row(top + dy) else {
                continue;
            };
            let mut cells: Vec<(&usize, &Char)> = row
                .iter()
                .filter(|(x, c)| **x >= left && !c.is_continuation())
                .collect();
            cells.sort_by_key(|(x, _)| **x);
            for (x, c) in cells {
                let dx = x - left;
                if dx + usize::from(c.width) > dest.width {
                    continue;
                }
                self.put(Point::new(dest.x + dx, dest.y + dy), c.clone());
            }
            if let Some(line) = src.source_line(top + dy)
                && dest.x == 0
            {
                self.line_map[dest.y + dy] = Some(line);
            }
        }
    }

    /// Printed text of row `y` with gaps as spaces and trailing blanks
    /// trimmed.
    pub fn row_text(&self, y: usize) -> String {
        let mut out = String::new();
        let extent = self.row_extent(y);
        let mut x = 0;
        while x < extent {
            match self.get(Point::new(x, y)) {
                Some(c) if c.is_continuation() => {}
                Some(c) => out.push_str(&c.text),
                None => out.push(' '),
            }
            x += 1;
        }
        out.truncate(out.trim_end().len());
        out
    }

    pub fn lines(&self) -> Vec<String> {
        (0..self.height()).map(|y| self.row_text(y)).collect()
    }
}
