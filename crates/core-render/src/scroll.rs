//! Viewport scrolling for windows taller or wider than their area.
//!
//! A window renders its whole content into its own screen and the layout
//! copies rows `[vertical_scroll, vertical_scroll + height)` into the frame.
//! `update` runs every frame and moves the offsets just enough to keep the
//! cursor inside the configured margins.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMargins {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl ScrollMargins {
    pub fn new(vertical: usize, horizontal: usize) -> Self {
        Self {
            top: vertical,
            bottom: vertical,
            left: horizontal,
            right: horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowScroll {
    pub vertical_scroll: usize,
    pub horizontal_scroll: usize,
    pub margins: ScrollMargins,
    /// Allow the last content row to scroll above the bottom of the window.
    pub allow_scroll_beyond_bottom: bool,
}

impl WindowScroll {
    pub fn new(margins: ScrollMargins) -> Self {
        Self {
            margins,
            ..Self::default()
        }
    }

    /// Adjust both offsets for a cursor at (`cursor_col`, `cursor_row`) of
    /// content `content_width` x `content_height`, shown in a window of
    /// `width` x `height`.
    pub fn update(
        &mut self,
        cursor_row: usize,
        content_height: usize,
        height: usize,
        cursor_col: usize,
        content_width: usize,
        width: usize,
    ) {
        let before = (self.vertical_scroll, self.horizontal_scroll);
        self.vertical_scroll = scroll_axis(
            self.vertical_scroll,
            self.margins.top,
            self.margins.bottom,
            cursor_row,
            height,
            content_height.max(cursor_row + 1),
            self.allow_scroll_beyond_bottom,
        );
        self.horizontal_scroll = scroll_axis(
            self.horizontal_scroll,
            self.margins.left,
            self.margins.right,
            cursor_col,
            width,
            content_width.max(cursor_col + 1),
            false,
        );
        if before != (self.vertical_scroll, self.horizontal_scroll) {
            trace!(
                target: "render.screen",
                vertical = self.vertical_scroll,
                horizontal = self.horizontal_scroll,
                "scroll"
            );
        }
    }

    /// Scroll by `delta` rows (mouse wheel), clamped to the content.
    pub fn scroll_by(&mut self, delta: isize, content_height: usize, height: usize) {
        let max = content_height.saturating_sub(height);
        self.vertical_scroll = self.vertical_scroll.saturating_add_signed(delta).min(max);
    }
}

/// One axis of the margin rule. Margins shrink near the content edges and
/// never exceed half the window; the offset only moves when the cursor
/// leaves the band between them.
fn scroll_axis(
    current: usize,
    margin_start: usize,
    margin_end: usize,
    cursor: usize,
    window: usize,
    content: usize,
    beyond_end: bool,
) -> usize {
    if window == 0 {
        return current;
    }
    let half = window / 2;
    let margin_start = margin_start.min(half).min(cursor);
    let margin_end = margin_end
        .min(half)
        .min(content.saturating_sub(1).saturating_sub(cursor));
    let mut scroll = current;
    if !beyond_end && scroll > content.saturating_sub(window) {
        scroll = content.saturating_sub(window);
    }
    if scroll + margin_start > cursor {
        scroll = cursor - margin_start;
    }
    if scroll + window < cursor + 1 + margin_end {
        scroll = cursor + 1 + margin_end - window;
    }
    scroll
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vertical(scroll: &mut WindowScroll, cursor: usize, content: usize, height: usize) -> usize {
        scroll.update(cursor, content, height, 0, 1, 80);
        scroll.vertical_scroll
    }

    #[test]
    fn stays_put_inside_margins() {
        let mut s = WindowScroll::new(ScrollMargins::new(2, 0));
        s.vertical_scroll = 5;
        assert_eq!(vertical(&mut s, 10, 50, 10), 5);
    }

    #[test]
    fn scrolls_down_keeping_bottom_margin() {
        let mut s = WindowScroll::new(ScrollMargins::new(2, 0));
        assert_eq!(vertical(&mut s, 9, 50, 10), 2);
    }

    #[test]
    fn scrolls_up_keeping_top_margin() {
        let mut s = WindowScroll::new(ScrollMargins::new(2, 0));
        s.vertical_scroll = 20;
        assert_eq!(vertical(&mut s, 21, 50, 10), 19);
    }

    #[test]
    fn margin_shrinks_at_content_end() {
        let mut s = WindowScroll::new(ScrollMargins::new(3, 0));
        assert_eq!(vertical(&mut s, 49, 50, 10), 40);
    }

    #[test]
    fn scrolls_back_when_content_shrinks() {
        let mut s = WindowScroll::new(ScrollMargins::default());
        s.vertical_scroll = 30;
        assert_eq!(vertical(&mut s, 2, 5, 10), 0);
    }

    #[test]
    fn horizontal_follows_cursor() {
        let mut s = WindowScroll::new(ScrollMargins::new(0, 1));
        s.update(0, 1, 5, 30, 40, 10);
        assert_eq!(s.horizontal_scroll, 22);
    }

    #[test]
    fn wheel_scroll_clamps() {
        let mut s = WindowScroll::default();
        s.scroll_by(100, 30, 10);
        assert_eq!(s.vertical_scroll, 20);
        s.scroll_by(-100, 30, 10);
        assert_eq!(s.vertical_scroll, 0);
    }

    proptest! {
        #[test]
        fn cursor_always_visible(
            start in 0usize..200,
            cursor in 0usize..200,
            extra in 0usize..50,
            height in 1usize..40,
            margin in 0usize..10,
        ) {
            let content = cursor + 1 + extra;
            let mut s = WindowScroll::new(ScrollMargins::new(margin, 0));
            s.vertical_scroll = start;
            let top = vertical(&mut s, cursor, content, height);
            prop_assert!(top <= cursor);
            prop_assert!(cursor < top + height);
        }
    }
}
