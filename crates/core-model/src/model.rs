//! The default prompt layout and the frame it produces.
//!
//! ```text
//! HSplit
//! ├── FloatContainer
//! │   ├── Window(BufferControl)          prompt + input
//! │   └── Float @ menu position          CompletionMenuControl
//! └── Window(TextControl)                toolbar, zero rows when empty
//! ```

use core_events::MouseEvent;
use core_render::{Rect, Screen, ScrollMargins, Style, StyledText, WindowScroll};
use core_state::{InputMode, SearchDirection, SessionState};
use core_text::SelectionKind;
use crossterm::style::Color;
use tracing::debug;

use crate::control::{BufferControl, CompletionMenuControl, Control, TextControl};
use crate::layout::{Float, FloatAnchor, FloatContainer, Layout, Node, NodeId, Window};

pub struct EditorModel {
    layout: Layout,
    buffer_window: NodeId,
    toolbar_window: NodeId,
}

impl EditorModel {
    pub fn new(prompt: Vec<StyledText>, margins: ScrollMargins) -> Self {
        let mut layout = Layout::new();
        let buffer_window = layout.add_window(
            Window::new(Control::Buffer(BufferControl::new(prompt))).with_scroll(WindowScroll::new(margins)),
        );
        let menu_window = layout.add_window(Window::new(Control::CompletionMenu(CompletionMenuControl::default())));
        let body = layout.add(Node::Float(FloatContainer {
            content: buffer_window,
            floats: vec![Float {
                content: menu_window,
                anchor: FloatAnchor::MenuPosition,
            }],
        }));
        let toolbar_window = layout.add_window(Window::new(Control::Text(TextControl::default())));
        let root = layout.add(Node::HSplit(vec![body, toolbar_window]));
        layout.set_root(root);
        layout.set_focus(buffer_window);
        Self {
            layout,
            buffer_window,
            toolbar_window,
        }
    }

    /// Plain-text prompt with default margins.
    pub fn with_prompt(prompt: &str) -> Self {
        Self::new(vec![StyledText::plain(prompt)], ScrollMargins::default())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn buffer_window(&self) -> NodeId {
        self.buffer_window
    }

    /// Move focus to `id`; non-focusable windows are ignored.
    pub fn focus(&mut self, id: NodeId) {
        self.layout.set_focus(id);
    }

    pub fn set_prompt(&mut self, prompt: Vec<StyledText>) {
        if let Some(Window {
            control: Control::Buffer(c),
            ..
        }) = self.layout.window_mut(self.buffer_window)
        {
            c.prompt = prompt;
        }
    }

    pub fn set_scroll_margins(&mut self, margins: ScrollMargins) {
        if let Some(w) = self.layout.window_mut(self.buffer_window) {
            w.scroll.margins = margins;
        }
    }

    /// Build the frame for a terminal `width` columns wide. The height is
    /// what the layout prefers, at least `min_height` and at most
    /// `max_height` rows.
    pub fn render(&mut self, session: &SessionState, width: usize, max_height: usize, min_height: usize) -> Screen {
        if let Some(w) = self.layout.window_mut(self.toolbar_window) {
            w.control = Control::Text(TextControl::new(toolbar(session)));
        }
        let mut screen = Screen::new();
        let Some(root) = self.layout.root() else {
            return screen;
        };
        let dim = self.layout.preferred_height(session, root, width, max_height);
        let height = dim.preferred.max(dim.min).max(min_height).min(max_height);
        self.layout.render(session, &mut screen, Rect::new(0, 0, width, height));
        screen.ensure_height(height);
        debug!(target: "model.layout", width, height, "frame");
        screen
    }

    /// `rows_above` is the terminal row of the first rendered line.
    pub fn handle_mouse(&mut self, session: &mut SessionState, event: MouseEvent, rows_above: usize) -> bool {
        self.layout.handle_mouse(session, event, rows_above)
    }
}

/// Status line under the input: validation error, search prompt, Vi mode,
/// macro recording and pending numeric argument.
pub fn toolbar(session: &SessionState) -> Vec<StyledText> {
    if let Some(err) = session.buffer.validation_error() {
        return vec![StyledText::new(Style::DEFAULT.fg(Color::Red), err.message.clone())];
    }
    if let Some(search) = session.buffer.isearch() {
        let name = match search.state.direction {
            SearchDirection::Backward => "reverse-i-search",
            SearchDirection::Forward => "i-search",
        };
        let failing = if search.failing() { "failing " } else { "" };
        return vec![StyledText::plain(format!("({failing}{name})`{}': ", search.state.text))];
    }

    let mut parts = Vec::new();
    if session.is_vi() {
        let selection = session.buffer.selection().map(|s| s.kind);
        let mode = match (session.vi.input_mode, selection) {
            (_, Some(SelectionKind::Characters)) => "-- VISUAL --",
            (_, Some(SelectionKind::Lines)) => "-- VISUAL LINE --",
            (_, Some(SelectionKind::Block)) => "-- VISUAL BLOCK --",
            (InputMode::Insert, None) => "-- INSERT --",
            (InputMode::InsertMultiple, None) => "-- INSERT (multiple) --",
            (InputMode::Replace, None) => "-- REPLACE --",
            (InputMode::Navigation, None) => "",
        };
        if !mode.is_empty() {
            parts.push(mode.to_string());
        }
        if let Some(register) = session.vi.recording_register {
            parts.push(format!("recording @{register}"));
        }
    } else if session.emacs.is_recording() {
        parts.push("Recording macro".to_string());
    }
    if let Some(arg) = &session.arg {
        parts.push(format!("Repeat: {arg}"));
    }
    if parts.is_empty() {
        return Vec::new();
    }
    vec![StyledText::new(Style::DEFAULT.with(core_render::Attrs::BOLD), parts.join("  "))]
}
