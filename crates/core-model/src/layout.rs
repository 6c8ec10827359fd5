//! Container tree for composing controls.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Parent links
//! and on-screen rectangles are not stored in the nodes; they are recomputed
//! on every render pass and used for mouse hit-testing until the next one.

use core_events::{MouseEvent, MouseEventKind};
use core_render::{Point, Rect, Screen, Style, WindowScroll};
use core_state::SessionState;
use tracing::{trace, warn};

use crate::control::Control;

/// Upper bound standing in for "as large as available".
pub const UNBOUNDED: usize = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Size constraints along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub min: usize,
    pub max: usize,
    pub preferred: usize,
    /// Share of leftover space relative to siblings. Zero never grows.
    pub weight: usize,
}

impl Default for Dimension {
    fn default() -> Self {
        Self {
            min: 0,
            max: UNBOUNDED,
            preferred: 0,
            weight: 1,
        }
    }
}

impl Dimension {
    pub fn new(min: usize, preferred: usize, max: usize) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            preferred: preferred.clamp(min, max),
            weight: 1,
        }
    }

    pub fn exact(size: usize) -> Self {
        Self::new(size, size, size)
    }

    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    /// Children stacked along this axis.
    pub fn sum(dims: &[Dimension]) -> Dimension {
        let mut out = Dimension::new(0, 0, 0);
        for d in dims {
            out.min = out.min.saturating_add(d.min);
            out.max = out.max.saturating_add(d.max).min(UNBOUNDED);
            out.preferred = out.preferred.saturating_add(d.preferred);
        }
        out
    }

    /// Children side by side across this axis.
    pub fn max_of(dims: &[Dimension]) -> Dimension {
        let min = dims.iter().map(|d| d.min).max().unwrap_or(0);
        let preferred = dims.iter().map(|d| d.preferred).max().unwrap_or(0);
        let max = dims.iter().map(|d| d.max).max().unwrap_or(0);
        Dimension::new(min, preferred, max)
    }
}

/// Split `available` among `dims`: everyone gets `min`, then space is handed
/// out by weight up to `preferred`, then up to `max`. `None` when the minimums
/// do not fit.
pub fn divide(dims: &[Dimension], available: usize) -> Option<Vec<usize>> {
    let mut sizes: Vec<usize> = dims.iter().map(|d| d.min).collect();
    let used: usize = sizes.iter().sum();
    if used > available {
        return None;
    }
    let mut left = available - used;
    grow(&mut sizes, dims, &mut left, |d| d.preferred);
    grow(&mut sizes, dims, &mut left, |d| d.max);
    Some(sizes)
}

fn grow(sizes: &mut [usize], dims: &[Dimension], left: &mut usize, target: impl Fn(&Dimension) -> usize) {
    loop {
        let mut progressed = false;
        for (size, d) in sizes.iter_mut().zip(dims) {
            if *left == 0 {
                return;
            }
            let goal = target(d);
            if d.weight > 0 && *size < goal {
                let step = d.weight.min(goal - *size).min(*left);
                *size += step;
                *left -= step;
                progressed = true;
            }
        }
        if !progressed {
            return;
        }
    }
}

/// A control shown in a rectangle, scrolled to keep its cursor visible.
#[derive(Debug, Clone)]
pub struct Window {
    pub control: Control,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub scroll: WindowScroll,
    /// Painted under the content.
    pub style: Style,
    /// Never take more rows than the content needs.
    pub dont_extend_height: bool,
    content_height: usize,
}

impl Window {
    pub fn new(control: Control) -> Self {
        Self {
            control,
            width: None,
            height: None,
            scroll: WindowScroll::default(),
            style: Style::DEFAULT,
            dont_extend_height: true,
            content_height: 0,
        }
    }

    pub fn with_height(mut self, height: Dimension) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: Dimension) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_scroll(mut self, scroll: WindowScroll) -> Self {
        self.scroll = scroll;
        self
    }

    fn preferred_width(&self, session: &SessionState, max_available: usize) -> Dimension {
        if let Some(width) = self.width {
            return width;
        }
        match self.control.preferred_width(session, max_available) {
            Some(p) => Dimension::new(0, p, UNBOUNDED),
            None => Dimension::default(),
        }
    }

    fn preferred_height(&self, session: &SessionState, width: usize, max_available: usize) -> Dimension {
        if let Some(height) = self.height {
            return height;
        }
        match self.control.preferred_height(session, width, max_available) {
            Some(p) => {
                let max = if self.dont_extend_height { p } else { UNBOUNDED };
                Dimension::new(p.min(1), p, max)
            }
            None => Dimension::default(),
        }
    }
}

/// Where a float is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatAnchor {
    /// Below (or above, if it does not fit) the menu position of the
    /// rendered content.
    MenuPosition,
    /// Fixed offset from the container's top-left.
    Fixed { left: usize, top: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct Float {
    pub content: NodeId,
    pub anchor: FloatAnchor,
}

#[derive(Debug, Clone)]
pub struct FloatContainer {
    pub content: NodeId,
    pub floats: Vec<Float>,
}

#[derive(Debug, Clone)]
pub enum Node {
    /// Children stacked top to bottom.
    HSplit(Vec<NodeId>),
    /// Children side by side.
    VSplit(Vec<NodeId>),
    Window(Box<Window>),
    Float(FloatContainer),
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    focus: Option<NodeId>,
    parents: Vec<Option<NodeId>>,
    rects: Vec<Option<Rect>>,
    /// Windows in paint order during the last render.
    painted: Vec<NodeId>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_window(&mut self, window: Window) -> NodeId {
        self.add(Node::Window(Box::new(window)))
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn window(&self, id: NodeId) -> Option<&Window> {
        match self.nodes.get(id.0) {
            Some(Node::Window(w)) => Some(w),
            _ => None,
        }
    }

    pub fn window_mut(&mut self, id: NodeId) -> Option<&mut Window> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Window(w)) => Some(w),
            _ => None,
        }
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn set_focus(&mut self, id: NodeId) {
        if self.window(id).is_some_and(|w| w.control.is_focusable()) {
            trace!(target: "model.layout", node = id.0, "focus");
            self.focus = Some(id);
        }
    }

    /// Parent of `id` as of the last render.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.0).copied().flatten()
    }

    /// Area `id` occupied in the last render, if it was shown.
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.rects.get(id.0).copied().flatten()
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id) {
            Some(Node::HSplit(c) | Node::VSplit(c)) => c.clone(),
            Some(Node::Float(f)) => std::iter::once(f.content)
                .chain(f.floats.iter().map(|fl| fl.content))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn compute_parents(&mut self) {
        self.parents = vec![None; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                if let Some(slot) = self.parents.get_mut(child.0) {
                    *slot = Some(id);
                }
                stack.push(child);
            }
        }
    }

    pub fn preferred_width(&self, session: &SessionState, id: NodeId, max_available: usize) -> Dimension {
        match self.node(id) {
            Some(Node::HSplit(children)) => Dimension::max_of(
                &children
                    .iter()
                    .map(|c| self.preferred_width(session, *c, max_available))
                    .collect::<Vec<_>>(),
            ),
            Some(Node::VSplit(children)) => Dimension::sum(
                &children
                    .iter()
                    .map(|c| self.preferred_width(session, *c, max_available))
                    .collect::<Vec<_>>(),
            ),
            Some(Node::Window(w)) => w.preferred_width(session, max_available),
            Some(Node::Float(f)) => self.preferred_width(session, f.content, max_available),
            None => Dimension::exact(0),
        }
    }

    pub fn preferred_height(&self, session: &SessionState, id: NodeId, width: usize, max_available: usize) -> Dimension {
        match self.node(id) {
            Some(Node::HSplit(children)) => Dimension::sum(
                &children
                    .iter()
                    .map(|c| self.preferred_height(session, *c, width, max_available))
                    .collect::<Vec<_>>(),
            ),
            Some(Node::VSplit(children)) => {
                let widths = self.column_widths(session, children, width).unwrap_or_default();
                Dimension::max_of(
                    &children
                        .iter()
                        .zip(widths)
                        .map(|(c, w)| self.preferred_height(session, *c, w, max_available))
                        .collect::<Vec<_>>(),
                )
            }
            Some(Node::Window(w)) => w.preferred_height(session, width, max_available),
            Some(Node::Float(f)) => {
                // Reserve rows for menu floats so they can open below.
                let mut dim = self.preferred_height(session, f.content, width, max_available);
                let extra: usize = f
                    .floats
                    .iter()
                    .filter(|fl| fl.anchor == FloatAnchor::MenuPosition)
                    .map(|fl| self.preferred_height(session, fl.content, width, max_available).preferred)
                    .max()
                    .unwrap_or(0);
                dim.preferred += extra;
                dim.max = dim.max.max(dim.preferred);
                dim
            }
            None => Dimension::exact(0),
        }
    }

    fn column_widths(&self, session: &SessionState, children: &[NodeId], width: usize) -> Option<Vec<usize>> {
        let dims: Vec<Dimension> = children
            .iter()
            .map(|c| self.preferred_width(session, *c, width))
            .collect();
        divide(&dims, width)
    }

    /// Paint the tree into `screen` within `area`. Unfocused windows never
    /// move the cursor.
    pub fn render(&mut self, session: &SessionState, screen: &mut Screen, area: Rect) {
        self.compute_parents();
        self.rects = vec![None; self.nodes.len()];
        self.painted.clear();
        screen.show_cursor = false;
        if let Some(root) = self.root {
            self.render_node(session, root, screen, area);
        }
    }

    fn render_node(&mut self, session: &SessionState, id: NodeId, screen: &mut Screen, area: Rect) {
        if let Some(slot) = self.rects.get_mut(id.0) {
            *slot = Some(area);
        }
        let children = self.children(id);
        match self.node(id) {
            Some(Node::HSplit(_)) => {
                let dims: Vec<Dimension> = children
                    .iter()
                    .map(|c| self.preferred_height(session, *c, area.width, area.height))
                    .collect();
                let Some(heights) = divide(&dims, area.height) else {
                    warn!(target: "model.layout", height = area.height, "window_too_small");
                    return;
                };
                let mut y = area.y;
                for (child, h) in children.into_iter().zip(heights) {
                    self.render_node(session, child, screen, Rect::new(area.x, y, area.width, h));
                    y += h;
                }
            }
            Some(Node::VSplit(_)) => {
                let Some(widths) = self.column_widths(session, &children, area.width) else {
                    warn!(target: "model.layout", width = area.width, "window_too_small");
                    return;
                };
                let mut x = area.x;
                for (child, w) in children.into_iter().zip(widths) {
                    self.render_node(session, child, screen, Rect::new(x, area.y, w, area.height));
                    x += w;
                }
            }
            Some(Node::Window(_)) => self.render_window(session, id, screen, area),
            Some(Node::Float(f)) => {
                let content = f.content;
                let floats = f.floats.clone();
                self.render_node(session, content, screen, area);
                for fl in floats {
                    if let Some(rect) = self.place_float(session, fl, screen, area) {
                        self.render_node(session, fl.content, screen, rect);
                    }
                }
            }
            None => {}
        }
    }

    fn place_float(&self, session: &SessionState, fl: Float, screen: &Screen, area: Rect) -> Option<Rect> {
        let width = self
            .preferred_width(session, fl.content, area.width)
            .preferred
            .min(area.width);
        let height = self
            .preferred_height(session, fl.content, width, area.height)
            .preferred
            .min(area.height);
        if width == 0 || height == 0 {
            return None;
        }
        let (x, y) = match fl.anchor {
            FloatAnchor::Fixed { left, top } => (area.x + left, area.y + top),
            FloatAnchor::MenuPosition => {
                let anchor = screen.menu_position?;
                let below = anchor.y + 1;
                let bottom = area.y + area.height;
                let y = if below + height <= bottom {
                    below
                } else if anchor.y >= area.y + height {
                    anchor.y - height
                } else {
                    below
                };
                (anchor.x, y)
            }
        };
        let x = x.min((area.x + area.width).saturating_sub(width)).max(area.x);
        let height = height.min((area.y + area.height).saturating_sub(y));
        (height > 0).then(|| Rect::new(x, y, width, height))
    }

    fn render_window(&mut self, session: &SessionState, id: NodeId, screen: &mut Screen, area: Rect) {
        let focused = self.focus == Some(id);
        let Some(window) = self.window_mut(id) else {
            return;
        };
        if area.is_empty() {
            return;
        }
        let content = window.control.create_screen(session, area.width, area.height);
        let cursor = content.cursor;
        window.content_height = content.height();
        window
            .scroll
            .update(cursor.y, content.height(), area.height, cursor.x, content.width(), area.width);
        let (top, left) = (window.scroll.vertical_scroll, window.scroll.horizontal_scroll);

        screen.blit(&content, top, left, area);
        if !window.style.is_default() {
            screen.fill_area(area, window.style);
        }

        let visible = |p: Point| {
            p.y >= top && p.y < top + area.height && p.x >= left && p.x <= left + area.width
        };
        if focused && content.show_cursor && visible(cursor) {
            screen.cursor = Point::new(area.x + cursor.x - left, area.y + cursor.y - top);
            screen.show_cursor = true;
        }
        if let Some(menu) = content.menu_position.filter(|p| visible(*p)) {
            screen.menu_position = Some(Point::new(area.x + menu.x - left, area.y + menu.y - top));
        }
        self.painted.push(id);
    }

    /// Topmost window painted at `p` in the last render.
    pub fn window_at(&self, p: Point) -> Option<NodeId> {
        self.painted
            .iter()
            .rev()
            .copied()
            .find(|id| self.rect(*id).is_some_and(|r| r.contains(p)))
    }

    /// Route a mouse event to the window under it. `rows_above` is the
    /// terminal row where the layout starts.
    pub fn handle_mouse(&mut self, session: &mut SessionState, event: MouseEvent, rows_above: usize) -> bool {
        let Some(row) = usize::from(event.row).checked_sub(rows_above) else {
            return false;
        };
        let p = Point::new(usize::from(event.column), row);
        let Some(id) = self.window_at(p) else {
            return false;
        };
        let Some(rect) = self.rect(id) else {
            return false;
        };
        if matches!(event.kind, MouseEventKind::Down(_)) {
            self.set_focus(id);
        }
        let Some(window) = self.window_mut(id) else {
            return false;
        };
        let local = Point::new(
            p.x - rect.x + window.scroll.horizontal_scroll,
            p.y - rect.y + window.scroll.vertical_scroll,
        );
        trace!(target: "model.layout", node = id.0, x = local.x, y = local.y, "mouse");
        if window.control.handle_mouse(session, event, local, rect.width) {
            return true;
        }
        match event.kind {
            MouseEventKind::ScrollUp => window.scroll.scroll_by(-1, window.content_height, rect.height),
            MouseEventKind::ScrollDown => window.scroll.scroll_by(1, window.content_height, rect.height),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{BufferControl, FillControl, TextControl};
    use core_events::{ModMask, MouseButton};
    use core_render::StyledText;
    use core_state::{Buffer, EditingMode};
    use core_text::Document;
    use pretty_assertions::assert_eq;

    fn session(text: &str) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.set_document(Document::at_end(text), false).unwrap();
        SessionState::new(buffer, EditingMode::Emacs)
    }

    fn text(s: &str) -> Window {
        Window::new(Control::Text(TextControl::new(vec![StyledText::plain(s)])))
    }

    #[test]
    fn divide_fills_preferred_then_max() {
        let dims = [Dimension::new(1, 3, 3), Dimension::new(0, 2, 10)];
        assert_eq!(divide(&dims, 4), Some(vec![3, 1]));
        assert_eq!(divide(&dims, 8), Some(vec![3, 5]));
        assert_eq!(divide(&dims, 20), Some(vec![3, 10]));
    }

    #[test]
    fn divide_respects_weights_and_minimums() {
        let dims = [Dimension::default().with_weight(1), Dimension::default().with_weight(3)];
        assert_eq!(divide(&dims, 8), Some(vec![2, 6]));
        assert_eq!(divide(&[Dimension::exact(5)], 4), None);
    }

    #[test]
    fn hsplit_stacks_windows() {
        let s = session("");
        let mut layout = Layout::new();
        let a = layout.add_window(text("top"));
        let b = layout.add_window(text("bottom"));
        let root = layout.add(Node::HSplit(vec![a, b]));
        layout.set_root(root);
        let mut screen = Screen::new();
        layout.render(&s, &mut screen, Rect::new(0, 0, 10, 2));
        assert_eq!(screen.lines(), vec!["top", "bottom"]);
        assert_eq!(layout.parent(a), Some(root));
        assert_eq!(layout.rect(b), Some(Rect::new(0, 1, 10, 1)));
    }

    #[test]
    fn vsplit_places_columns() {
        let s = session("");
        let mut layout = Layout::new();
        let a = layout.add_window(text("ab").with_width(Dimension::exact(3)));
        let sep = layout.add_window(
            Window::new(Control::Fill(FillControl::new('|', Style::DEFAULT))).with_width(Dimension::exact(1)),
        );
        let b = layout.add_window(text("cd"));
        let root = layout.add(Node::VSplit(vec![a, sep, b]));
        layout.set_root(root);
        let mut screen = Screen::new();
        layout.render(&s, &mut screen, Rect::new(0, 0, 8, 1));
        assert_eq!(screen.row_text(0), "ab |cd");
    }

    #[test]
    fn focused_window_scrolls_to_cursor() {
        let s = session("1\n2\n3\n4\n5");
        let mut layout = Layout::new();
        let w = layout.add_window(Window::new(Control::Buffer(BufferControl::new(Vec::new()))));
        layout.set_root(w);
        layout.set_focus(w);
        let mut screen = Screen::new();
        layout.render(&s, &mut screen, Rect::new(0, 0, 5, 2));
        assert_eq!(screen.lines(), vec!["4", "5"]);
        assert_eq!(screen.cursor, Point::new(1, 1));
        assert!(screen.show_cursor);
    }

    #[test]
    fn fixed_float_draws_over_content() {
        let s = session("");
        let mut layout = Layout::new();
        let body = layout.add_window(text("..........").with_height(Dimension::exact(2)));
        let popup = layout.add_window(text("hi"));
        let root = layout.add(Node::Float(FloatContainer {
            content: body,
            floats: vec![Float {
                content: popup,
                anchor: FloatAnchor::Fixed { left: 3, top: 1 },
            }],
        }));
        layout.set_root(root);
        let mut screen = Screen::new();
        layout.render(&s, &mut screen, Rect::new(0, 0, 10, 2));
        assert_eq!(screen.row_text(1), "   hi");
        assert_eq!(layout.window_at(Point::new(3, 1)), Some(popup));
        assert_eq!(layout.window_at(Point::new(0, 0)), Some(body));
    }

    #[test]
    fn click_routes_to_window_under_pointer() {
        let mut s = session("abc\ndef");
        let mut layout = Layout::new();
        let header = layout.add_window(text("header"));
        let w = layout.add_window(Window::new(Control::Buffer(BufferControl::new(Vec::new()))));
        let root = layout.add(Node::HSplit(vec![header, w]));
        layout.set_root(root);
        layout.set_focus(w);
        let mut screen = Screen::new();
        layout.render(&s, &mut screen, Rect::new(0, 0, 10, 3));
        let event = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 1,
            row: 5,
            mods: ModMask::empty(),
        };
        assert!(layout.handle_mouse(&mut s, event, 3));
        assert_eq!(s.buffer.cursor_position(), 5);
        assert!(!layout.handle_mouse(&mut s, event, 10));
    }
}
